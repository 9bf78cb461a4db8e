use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{FileObject, StorageQuota};
use crate::database::DatabaseError;
use crate::storage::object_key;

const FILE_COLUMNS: &str =
    "id, owner_id, course_id, object_key, filename, content_type, declared_bytes, size_bytes, status, created_at";

#[derive(Debug)]
pub struct NewFile<'a> {
    pub owner_id: Uuid,
    pub course_id: Option<Uuid>,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
}

#[derive(Debug)]
pub enum UploadOutcome {
    Created(FileObject),
    QuotaExceeded(StorageQuota),
}

#[derive(Debug)]
pub enum CompleteOutcome {
    Completed(FileObject),
    /// Storage holds more than the upload reserved; the file stays pending
    Oversized { declared: i64, actual: i64 },
}

/// Quota adjustment when a reservation of `declared` bytes settles.
/// An unknown size keeps the reservation charged.
pub fn settlement_delta(declared: i64, reported: Option<i64>) -> i64 {
    reported.map(|actual| actual - declared).unwrap_or(0)
}

async fn adjust_used(tx: &mut Transaction<'_, Postgres>, owner_id: Uuid, delta: i64) -> Result<(), DatabaseError> {
    if delta != 0 {
        sqlx::query("UPDATE storage_quotas SET used_bytes = GREATEST(used_bytes + $2, 0) WHERE owner_id = $1")
            .bind(owner_id)
            .bind(delta)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn locked_quota(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    default_quota: i64,
) -> Result<StorageQuota, DatabaseError> {
    sqlx::query("INSERT INTO storage_quotas (owner_id, quota_bytes) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(owner_id)
        .bind(default_quota)
        .execute(&mut **tx)
        .await?;

    Ok(sqlx::query_as::<_, StorageQuota>(
        "SELECT owner_id, quota_bytes, used_bytes, reconciled_at FROM storage_quotas WHERE owner_id = $1 FOR UPDATE",
    )
    .bind(owner_id)
    .fetch_one(&mut **tx)
    .await?)
}

/// Reserve a pending file row if the owner's quota has room for it.
/// The declared size counts against `used_bytes` from this point on.
pub async fn create_pending(pool: &PgPool, new: NewFile<'_>, default_quota: i64) -> Result<UploadOutcome, DatabaseError> {
    let mut tx = pool.begin().await?;
    let quota = locked_quota(&mut tx, new.owner_id, default_quota).await?;

    if quota.used_bytes.saturating_add(new.size_bytes) > quota.quota_bytes {
        return Ok(UploadOutcome::QuotaExceeded(quota));
    }

    let id = Uuid::new_v4();
    let sql = format!(
        "INSERT INTO files (id, owner_id, course_id, object_key, filename, content_type, declared_bytes)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        FILE_COLUMNS
    );
    let file = sqlx::query_as::<_, FileObject>(&sql)
        .bind(id)
        .bind(new.owner_id)
        .bind(new.course_id)
        .bind(object_key(new.owner_id, id, new.filename))
        .bind(new.filename)
        .bind(new.content_type)
        .bind(new.size_bytes)
        .fetch_one(&mut *tx)
        .await?;

    adjust_used(&mut tx, new.owner_id, new.size_bytes).await?;

    tx.commit().await?;
    Ok(UploadOutcome::Created(file))
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<FileObject>, DatabaseError> {
    let sql = format!("SELECT {} FROM files WHERE id = $1", FILE_COLUMNS);
    Ok(sqlx::query_as::<_, FileObject>(&sql).bind(id).fetch_optional(pool).await?)
}

/// Mark a pending upload finished. `reported` is the size storage holds,
/// `None` when it could not say; the backfill job fills those in later.
pub async fn complete(pool: &PgPool, id: Uuid, reported: Option<i64>) -> Result<CompleteOutcome, DatabaseError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM files WHERE id = $1 FOR UPDATE", FILE_COLUMNS);
    let pending = sqlx::query_as::<_, FileObject>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("File {} not found", id)))?;

    if pending.status != "pending" {
        return Err(DatabaseError::Conflict("File upload is already complete".to_string()));
    }
    if let Some(actual) = reported.filter(|actual| *actual > pending.declared_bytes) {
        return Ok(CompleteOutcome::Oversized {
            declared: pending.declared_bytes,
            actual,
        });
    }

    let sql = format!(
        "UPDATE files SET status = 'uploaded', size_bytes = $2 WHERE id = $1 RETURNING {}",
        FILE_COLUMNS
    );
    let file = sqlx::query_as::<_, FileObject>(&sql)
        .bind(id)
        .bind(reported)
        .fetch_one(&mut *tx)
        .await?;

    adjust_used(&mut tx, file.owner_id, settlement_delta(file.declared_bytes, reported)).await?;

    tx.commit().await?;
    Ok(CompleteOutcome::Completed(file))
}

/// Remove a file and release whatever it holds against the quota
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;

    let sql = format!("DELETE FROM files WHERE id = $1 RETURNING {}", FILE_COLUMNS);
    let file = sqlx::query_as::<_, FileObject>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("File {} not found", id)))?;

    let held = file.size_bytes.unwrap_or(file.declared_bytes);
    adjust_used(&mut tx, file.owner_id, -held).await?;

    tx.commit().await?;
    Ok(())
}

/// Recompute `used_bytes` for every owner: stored sizes where known,
/// declared sizes for pending uploads and unknown sizes
pub async fn reconcile_quotas(pool: &PgPool, default_quota: i64) -> Result<u64, DatabaseError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO storage_quotas (owner_id, quota_bytes)
         SELECT DISTINCT owner_id, $1::bigint FROM files
         ON CONFLICT DO NOTHING",
    )
    .bind(default_quota)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query(
        "UPDATE storage_quotas q SET
            used_bytes = COALESCE((
                SELECT SUM(COALESCE(f.size_bytes, f.declared_bytes))
                FROM files f WHERE f.owner_id = q.owner_id
            ), 0)::bigint,
            reconciled_at = now()",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}

/// Uploaded files whose stored size is still unknown
pub async fn missing_sizes(pool: &PgPool, limit: i64) -> Result<Vec<FileObject>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM files WHERE status = 'uploaded' AND size_bytes IS NULL ORDER BY created_at LIMIT $1",
        FILE_COLUMNS
    );
    Ok(sqlx::query_as::<_, FileObject>(&sql).bind(limit).fetch_all(pool).await?)
}

/// Record a size found by the backfill and swap the declared reservation
/// for it. Returns false when the file already had a size.
pub async fn set_size(pool: &PgPool, id: Uuid, size_bytes: i64) -> Result<bool, DatabaseError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE files SET size_bytes = $2 WHERE id = $1 AND size_bytes IS NULL RETURNING {}",
        FILE_COLUMNS
    );
    let Some(file) = sqlx::query_as::<_, FileObject>(&sql)
        .bind(id)
        .bind(size_bytes)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(false);
    };

    adjust_used(&mut tx, file.owner_id, settlement_delta(file.declared_bytes, Some(size_bytes))).await?;

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_swaps_reservation_for_reported_size() {
        assert_eq!(settlement_delta(1000, Some(400)), -600);
        assert_eq!(settlement_delta(1000, Some(1000)), 0);
        assert_eq!(settlement_delta(1000, None), 0);
        assert_eq!(settlement_delta(100, Some(150)), 50);
    }
}

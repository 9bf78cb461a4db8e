use semver::Version;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::{ProviderHealth, RegistryCourse, RegistryProvider, RegistryVersion};
use crate::database::DatabaseError;

const COURSE_COLUMNS: &str =
    "id, external_id, provider, title, description, status, created_by, created_at, updated_at";
const VERSION_COLUMNS: &str = "id, registry_course_id, version, manifest, status, created_by, reviewed_by, created_at";

#[derive(Debug)]
pub struct NewRegistryCourse {
    pub external_id: String,
    pub provider: String,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Default)]
pub struct RegistryCourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// `candidate` must be strictly greater than every existing version.
/// Unparseable stored versions are ignored.
pub fn ensure_newer<'a>(existing: impl IntoIterator<Item = &'a str>, candidate: &Version) -> Result<(), String> {
    let latest = existing.into_iter().filter_map(|v| Version::parse(v).ok()).max();
    match latest {
        Some(latest) if *candidate <= latest => Err(format!(
            "Version {} must be greater than the latest version {}",
            candidate, latest
        )),
        _ => Ok(()),
    }
}

pub async fn list_courses(
    pool: &PgPool,
    status: Option<&str>,
    page: Page,
) -> Result<Vec<RegistryCourse>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM registry_courses
         WHERE ($3::text IS NULL OR status = $3)
         ORDER BY created_at DESC
         LIMIT $1 OFFSET $2",
        COURSE_COLUMNS
    );
    Ok(sqlx::query_as::<_, RegistryCourse>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .bind(status)
        .fetch_all(pool)
        .await?)
}

pub async fn get_course(pool: &PgPool, id: Uuid) -> Result<Option<RegistryCourse>, DatabaseError> {
    let sql = format!("SELECT {} FROM registry_courses WHERE id = $1", COURSE_COLUMNS);
    Ok(sqlx::query_as::<_, RegistryCourse>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create_course(pool: &PgPool, new: NewRegistryCourse) -> Result<RegistryCourse, DatabaseError> {
    let sql = format!(
        "INSERT INTO registry_courses (external_id, provider, title, description, created_by)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (external_id) DO NOTHING
         RETURNING {}",
        COURSE_COLUMNS
    );
    sqlx::query_as::<_, RegistryCourse>(&sql)
        .bind(new.external_id.trim())
        .bind(new.provider.trim())
        .bind(new.title.trim())
        .bind(new.description)
        .bind(new.created_by)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::Conflict(format!("External id '{}' is already registered", new.external_id)))
}

pub async fn update_course(pool: &PgPool, id: Uuid, changes: RegistryCourseUpdate) -> Result<RegistryCourse, DatabaseError> {
    let sql = format!(
        "UPDATE registry_courses SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            status = COALESCE($4, status),
            updated_at = now()
         WHERE id = $1
         RETURNING {}",
        COURSE_COLUMNS
    );
    sqlx::query_as::<_, RegistryCourse>(&sql)
        .bind(id)
        .bind(changes.title.as_deref().map(str::trim))
        .bind(changes.description)
        .bind(changes.status)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Registry course {} not found", id)))
}

pub async fn delete_course(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM registry_courses WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Registry course {} not found", id)));
    }
    Ok(())
}

pub async fn list_versions(pool: &PgPool, course_id: Uuid) -> Result<Vec<RegistryVersion>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM registry_versions WHERE registry_course_id = $1 ORDER BY created_at DESC",
        VERSION_COLUMNS
    );
    Ok(sqlx::query_as::<_, RegistryVersion>(&sql).bind(course_id).fetch_all(pool).await?)
}

/// Add a version, enforcing strictly increasing semver per course
pub async fn create_version(
    pool: &PgPool,
    course_id: Uuid,
    version: &Version,
    manifest: Value,
    created_by: Uuid,
) -> Result<RegistryVersion, DatabaseError> {
    let mut tx = pool.begin().await?;

    let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM registry_courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Err(DatabaseError::NotFound(format!("Registry course {} not found", course_id)));
    }

    let existing: Vec<(String,)> = sqlx::query_as("SELECT version FROM registry_versions WHERE registry_course_id = $1")
        .bind(course_id)
        .fetch_all(&mut *tx)
        .await?;
    ensure_newer(existing.iter().map(|(v,)| v.as_str()), version).map_err(DatabaseError::Conflict)?;

    let sql = format!(
        "INSERT INTO registry_versions (registry_course_id, version, manifest, created_by)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        VERSION_COLUMNS
    );
    let created = sqlx::query_as::<_, RegistryVersion>(&sql)
        .bind(course_id)
        .bind(version.to_string())
        .bind(manifest)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("Registry course {} gained version {}", course_id, version);
    Ok(created)
}

/// Approve or reject a pending version
pub async fn review_version(
    pool: &PgPool,
    id: Uuid,
    decision: &str,
    reviewer: Uuid,
) -> Result<RegistryVersion, DatabaseError> {
    let sql = format!(
        "UPDATE registry_versions SET status = $2, reviewed_by = $3
         WHERE id = $1 AND status = 'pending'
         RETURNING {}",
        VERSION_COLUMNS
    );
    let reviewed = sqlx::query_as::<_, RegistryVersion>(&sql)
        .bind(id)
        .bind(decision)
        .bind(reviewer)
        .fetch_optional(pool)
        .await?;

    if let Some(version) = reviewed {
        return Ok(version);
    }

    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM registry_versions WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if exists {
        Err(DatabaseError::Conflict("Only pending versions can be reviewed".to_string()))
    } else {
        Err(DatabaseError::NotFound(format!("Registry version {} not found", id)))
    }
}

pub async fn providers(pool: &PgPool) -> Result<Vec<RegistryProvider>, DatabaseError> {
    Ok(sqlx::query_as::<_, RegistryProvider>(
        "SELECT id, name, health_url, created_at FROM registry_providers ORDER BY name",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn providers_with_health(pool: &PgPool) -> Result<Vec<ProviderHealth>, DatabaseError> {
    Ok(sqlx::query_as::<_, ProviderHealth>(
        "SELECT p.id AS provider_id, p.name, p.health_url, h.status, h.latency_ms, h.detail, h.checked_at
         FROM registry_providers p
         LEFT JOIN provider_health h ON h.provider_id = p.id
         ORDER BY p.name",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn record_health(
    pool: &PgPool,
    provider_id: Uuid,
    status: &str,
    latency_ms: Option<i64>,
    detail: Option<&str>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO provider_health (provider_id, status, latency_ms, detail, checked_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (provider_id) DO UPDATE SET
            status = EXCLUDED.status,
            latency_ms = EXCLUDED.latency_ms,
            detail = EXCLUDED.detail,
            checked_at = EXCLUDED.checked_at",
    )
    .bind(provider_id)
    .bind(status)
    .bind(latency_ms)
    .bind(detail)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_must_increase() {
        let existing = ["1.0.0", "1.2.0", "not-a-version"];
        assert!(ensure_newer(existing, &Version::new(1, 2, 1)).is_ok());
        assert!(ensure_newer(existing, &Version::new(1, 2, 0)).is_err());
        assert!(ensure_newer(existing, &Version::new(1, 1, 9)).is_err());
        assert!(ensure_newer([], &Version::new(0, 0, 1)).is_ok());
    }

    #[test]
    fn prereleases_sort_below_release() {
        let pre = Version::parse("2.0.0-beta.1").unwrap();
        assert!(ensure_newer(["2.0.0"], &pre).is_err());
        assert!(ensure_newer(["1.9.0"], &pre).is_ok());
    }
}

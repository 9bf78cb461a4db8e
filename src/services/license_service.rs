use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::License;
use crate::database::DatabaseError;

const LICENSE_COLUMNS: &str =
    "id, registry_course_id, holder, seats, seats_used, status, expires_at, created_at, updated_at";

#[derive(Debug, Default)]
pub struct LicenseUpdate {
    pub seats: Option<i32>,
    pub status: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Rules for changing an existing license
pub fn check_update(current: &License, changes: &LicenseUpdate) -> Result<(), String> {
    if current.status == "revoked" {
        return Err("Revoked licenses cannot be changed".to_string());
    }
    if let Some(seats) = changes.seats {
        if seats < current.seats_used {
            return Err(format!(
                "Seats cannot drop below the {} already in use",
                current.seats_used
            ));
        }
    }
    Ok(())
}

/// Why a seat cannot be assigned, if it cannot
pub fn assign_blocker(license: &License, now: DateTime<Utc>) -> Option<&'static str> {
    if license.status != "active" {
        Some("License is not active")
    } else if license.expires_at.is_some_and(|at| at <= now) {
        Some("License has expired")
    } else if license.seats_used >= license.seats {
        Some("No seats left on this license")
    } else {
        None
    }
}

pub async fn list(pool: &PgPool, page: Page) -> Result<Vec<License>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM licenses ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        LICENSE_COLUMNS
    );
    Ok(sqlx::query_as::<_, License>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<License>, DatabaseError> {
    let sql = format!("SELECT {} FROM licenses WHERE id = $1", LICENSE_COLUMNS);
    Ok(sqlx::query_as::<_, License>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create(
    pool: &PgPool,
    registry_course_id: Uuid,
    holder: &str,
    seats: i32,
    expires_at: Option<DateTime<Utc>>,
) -> Result<License, DatabaseError> {
    let sql = format!(
        "INSERT INTO licenses (registry_course_id, holder, seats, expires_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        LICENSE_COLUMNS
    );
    Ok(sqlx::query_as::<_, License>(&sql)
        .bind(registry_course_id)
        .bind(holder.trim())
        .bind(seats)
        .bind(expires_at)
        .fetch_one(pool)
        .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: LicenseUpdate) -> Result<License, DatabaseError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM licenses WHERE id = $1 FOR UPDATE", LICENSE_COLUMNS);
    let current = sqlx::query_as::<_, License>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("License {} not found", id)))?;

    check_update(&current, &changes).map_err(DatabaseError::Conflict)?;

    let sql = format!(
        "UPDATE licenses SET
            seats = COALESCE($2, seats),
            status = COALESCE($3, status),
            expires_at = COALESCE($4, expires_at),
            updated_at = now()
         WHERE id = $1
         RETURNING {}",
        LICENSE_COLUMNS
    );
    let updated = sqlx::query_as::<_, License>(&sql)
        .bind(id)
        .bind(changes.seats)
        .bind(changes.status)
        .bind(changes.expires_at)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Consume one seat
pub async fn assign_seat(pool: &PgPool, id: Uuid) -> Result<License, DatabaseError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM licenses WHERE id = $1 FOR UPDATE", LICENSE_COLUMNS);
    let current = sqlx::query_as::<_, License>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("License {} not found", id)))?;

    if let Some(reason) = assign_blocker(&current, Utc::now()) {
        return Err(DatabaseError::Conflict(reason.to_string()));
    }

    let sql = format!(
        "UPDATE licenses SET seats_used = seats_used + 1, updated_at = now() WHERE id = $1 RETURNING {}",
        LICENSE_COLUMNS
    );
    let updated = sqlx::query_as::<_, License>(&sql).bind(id).fetch_one(&mut *tx).await?;

    tx.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn license(seats: i32, used: i32, status: &str) -> License {
        License {
            id: Uuid::new_v4(),
            registry_course_id: Uuid::new_v4(),
            holder: "Springfield High".into(),
            seats,
            seats_used: used,
            status: status.into(),
            expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn seats_never_drop_below_usage() {
        let current = license(10, 4, "active");
        let shrink = LicenseUpdate { seats: Some(3), ..Default::default() };
        assert!(check_update(&current, &shrink).is_err());
        let ok = LicenseUpdate { seats: Some(4), ..Default::default() };
        assert!(check_update(&current, &ok).is_ok());
    }

    #[test]
    fn revoked_is_terminal() {
        let current = license(10, 0, "revoked");
        let reactivate = LicenseUpdate { status: Some("active".into()), ..Default::default() };
        assert!(check_update(&current, &reactivate).is_err());
    }

    #[test]
    fn seat_assignment_blockers() {
        let now = Utc::now();
        assert_eq!(assign_blocker(&license(2, 1, "active"), now), None);
        assert!(assign_blocker(&license(2, 2, "active"), now).is_some());
        assert!(assign_blocker(&license(2, 0, "suspended"), now).is_some());

        let mut expired = license(2, 0, "active");
        expired.expires_at = Some(now - Duration::days(1));
        assert_eq!(assign_blocker(&expired, now), Some("License has expired"));
    }
}

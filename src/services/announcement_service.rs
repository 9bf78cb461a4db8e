use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::Announcement;
use crate::database::DatabaseError;

const ANNOUNCEMENT_COLUMNS: &str = "id, course_id, author_id, title, body, publish_at, created_at";

/// Newest first; scheduled announcements only when `include_scheduled`
pub async fn list(
    pool: &PgPool,
    course_id: Uuid,
    include_scheduled: bool,
    page: Page,
) -> Result<Vec<Announcement>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM announcements
         WHERE course_id = $1 AND ($4::boolean OR publish_at <= now())
         ORDER BY publish_at DESC
         LIMIT $2 OFFSET $3",
        ANNOUNCEMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Announcement>(&sql)
        .bind(course_id)
        .bind(page.limit)
        .bind(page.offset)
        .bind(include_scheduled)
        .fetch_all(pool)
        .await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Announcement>, DatabaseError> {
    let sql = format!("SELECT {} FROM announcements WHERE id = $1", ANNOUNCEMENT_COLUMNS);
    Ok(sqlx::query_as::<_, Announcement>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create(
    pool: &PgPool,
    course_id: Uuid,
    author_id: Uuid,
    title: &str,
    body: &str,
    publish_at: Option<DateTime<Utc>>,
) -> Result<Announcement, DatabaseError> {
    let sql = format!(
        "INSERT INTO announcements (course_id, author_id, title, body, publish_at)
         VALUES ($1, $2, $3, $4, COALESCE($5, now()))
         RETURNING {}",
        ANNOUNCEMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Announcement>(&sql)
        .bind(course_id)
        .bind(author_id)
        .bind(title.trim())
        .bind(body)
        .bind(publish_at)
        .fetch_one(pool)
        .await?)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Announcement {} not found", id)));
    }
    Ok(())
}

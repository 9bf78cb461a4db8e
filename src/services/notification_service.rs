use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::Notification;
use crate::database::DatabaseError;

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, body, payload, read_at, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Announcement,
    GradePosted,
    Message,
    DueSoon,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Announcement => "announcement",
            NotificationKind::GradePosted => "grade_posted",
            NotificationKind::Message => "message",
            NotificationKind::DueSoon => "due_soon",
        }
    }
}

pub async fn notify(
    pool: &PgPool,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    body: Option<&str>,
    payload: Value,
) -> Result<Notification, DatabaseError> {
    let sql = format!(
        "INSERT INTO notifications (user_id, kind, title, body, payload)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        NOTIFICATION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Notification>(&sql)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(title)
        .bind(body)
        .bind(payload)
        .fetch_one(pool)
        .await?)
}

/// Fan one notification out to many users in a single statement
pub async fn notify_many(
    pool: &PgPool,
    user_ids: &[Uuid],
    kind: NotificationKind,
    title: &str,
    body: Option<&str>,
    payload: Value,
) -> Result<u64, DatabaseError> {
    if user_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "INSERT INTO notifications (user_id, kind, title, body, payload)
         SELECT u, $2, $3, $4, $5 FROM UNNEST($1::uuid[]) AS u",
    )
    .bind(user_ids)
    .bind(kind.as_str())
    .bind(title)
    .bind(body)
    .bind(payload)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list(pool: &PgPool, user_id: Uuid, unread_only: bool, page: Page) -> Result<Vec<Notification>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM notifications
         WHERE user_id = $1 AND (NOT $4::boolean OR read_at IS NULL)
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
        NOTIFICATION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Notification>(&sql)
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .bind(unread_only)
        .fetch_all(pool)
        .await?)
}

pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Notification, DatabaseError> {
    let sql = format!(
        "UPDATE notifications SET read_at = COALESCE(read_at, now())
         WHERE id = $1 AND user_id = $2
         RETURNING {}",
        NOTIFICATION_COLUMNS
    );
    sqlx::query_as::<_, Notification>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Notification {} not found", id)))
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE notifications SET read_at = now() WHERE user_id = $1 AND read_at IS NULL")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_read_older_than(pool: &PgPool, days: i64) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "DELETE FROM notifications
         WHERE read_at IS NOT NULL AND created_at < now() - make_interval(days => $1::int)",
    )
    .bind(days)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(NotificationKind::GradePosted.as_str(), "grade_posted");
        assert_eq!(NotificationKind::DueSoon.as_str(), "due_soon");
    }
}

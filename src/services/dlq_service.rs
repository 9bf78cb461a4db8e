use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::DlqMessage;
use crate::database::DatabaseError;

const DLQ_COLUMNS: &str = "id, topic, payload, error, attempts, status, created_at, updated_at";

/// Topic prefix for failed background job runs
pub const JOB_TOPIC_PREFIX: &str = "job:";

pub fn job_topic(job: &str) -> String {
    format!("{}{}", JOB_TOPIC_PREFIX, job)
}

/// Job name behind a `job:<name>` topic
pub fn job_from_topic(topic: &str) -> Option<&str> {
    topic.strip_prefix(JOB_TOPIC_PREFIX).filter(|name| !name.is_empty())
}

pub async fn push(pool: &PgPool, topic: &str, payload: Value, error: &str) -> Result<DlqMessage, DatabaseError> {
    let sql = format!(
        "INSERT INTO dlq_messages (topic, payload, error) VALUES ($1, $2, $3) RETURNING {}",
        DLQ_COLUMNS
    );
    Ok(sqlx::query_as::<_, DlqMessage>(&sql)
        .bind(topic)
        .bind(payload)
        .bind(error)
        .fetch_one(pool)
        .await?)
}

pub async fn list(pool: &PgPool, status: Option<&str>, page: Page) -> Result<Vec<DlqMessage>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM dlq_messages
         WHERE ($3::text IS NULL OR status = $3)
         ORDER BY created_at DESC
         LIMIT $1 OFFSET $2",
        DLQ_COLUMNS
    );
    Ok(sqlx::query_as::<_, DlqMessage>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .bind(status)
        .fetch_all(pool)
        .await?)
}

async fn transition(pool: &PgPool, id: Uuid, set: &str) -> Result<DlqMessage, DatabaseError> {
    let sql = format!(
        "UPDATE dlq_messages SET {}, updated_at = now()
         WHERE id = $1 AND status = 'pending'
         RETURNING {}",
        set, DLQ_COLUMNS
    );
    if let Some(message) = sqlx::query_as::<_, DlqMessage>(&sql).bind(id).fetch_optional(pool).await? {
        return Ok(message);
    }

    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM dlq_messages WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if exists {
        Err(DatabaseError::Conflict("Only pending messages can be changed".to_string()))
    } else {
        Err(DatabaseError::NotFound(format!("DLQ message {} not found", id)))
    }
}

pub async fn mark_replayed(pool: &PgPool, id: Uuid) -> Result<DlqMessage, DatabaseError> {
    transition(pool, id, "status = 'replayed', attempts = attempts + 1").await
}

pub async fn discard(pool: &PgPool, id: Uuid) -> Result<DlqMessage, DatabaseError> {
    transition(pool, id, "status = 'discarded'").await
}

/// Drop settled (replayed or discarded) messages past the horizon
pub async fn purge_settled_older_than(pool: &PgPool, days: i64) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "DELETE FROM dlq_messages
         WHERE status IN ('replayed', 'discarded') AND updated_at < now() - make_interval(days => $1::int)",
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
    fn job_topics() {
        assert_eq!(job_topic("retention"), "job:retention");
        assert_eq!(job_from_topic("job:retention"), Some("retention"));
        assert_eq!(job_from_topic("job:"), None);
        assert_eq!(job_from_topic("webhook:grade"), None);
    }
}

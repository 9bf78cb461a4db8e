use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::AuditLog;
use crate::database::DatabaseError;

pub async fn record(
    pool: &PgPool,
    actor_id: Option<Uuid>,
    action: &str,
    entity_type: &str,
    entity_id: Option<&str>,
    details: Value,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, details)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(actor_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(details)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    actor_id: Option<Uuid>,
    entity_type: Option<&str>,
    page: Page,
) -> Result<Vec<AuditLog>, DatabaseError> {
    Ok(sqlx::query_as::<_, AuditLog>(
        "SELECT id, actor_id, action, entity_type, entity_id, details, created_at
         FROM audit_logs
         WHERE ($3::uuid IS NULL OR actor_id = $3)
           AND ($4::text IS NULL OR entity_type = $4)
         ORDER BY created_at DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(page.limit)
    .bind(page.offset)
    .bind(actor_id)
    .bind(entity_type)
    .fetch_all(pool)
    .await?)
}

pub async fn purge_older_than(pool: &PgPool, days: i64) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < now() - make_interval(days => $1::int)")
        .bind(days)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

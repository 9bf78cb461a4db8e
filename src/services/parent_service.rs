use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Profile;
use crate::database::DatabaseError;

pub async fn children(pool: &PgPool, parent_id: Uuid) -> Result<Vec<Profile>, DatabaseError> {
    Ok(sqlx::query_as::<_, Profile>(
        "SELECT p.id, p.email, p.display_name, p.role, p.created_at
         FROM parent_links l JOIN profiles p ON p.id = l.student_id
         WHERE l.parent_id = $1
         ORDER BY p.display_name",
    )
    .bind(parent_id)
    .fetch_all(pool)
    .await?)
}

pub async fn is_linked(pool: &PgPool, parent_id: Uuid, student_id: Uuid) -> Result<bool, DatabaseError> {
    let (linked,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM parent_links WHERE parent_id = $1 AND student_id = $2)",
    )
    .bind(parent_id)
    .bind(student_id)
    .fetch_one(pool)
    .await?;
    Ok(linked)
}

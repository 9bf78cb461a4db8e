use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Profile;
use crate::database::DatabaseError;

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
    Ok(sqlx::query_as::<_, Profile>(
        "SELECT id, email, display_name, role, created_at FROM profiles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Module;
use crate::database::DatabaseError;

const MODULE_COLUMNS: &str = "id, course_id, title, body, position, created_at, updated_at";

#[derive(Debug, Default)]
pub struct ModuleUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub position: Option<i32>,
}

pub async fn list(pool: &PgPool, course_id: Uuid) -> Result<Vec<Module>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM modules WHERE course_id = $1 ORDER BY position, created_at",
        MODULE_COLUMNS
    );
    Ok(sqlx::query_as::<_, Module>(&sql).bind(course_id).fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Module>, DatabaseError> {
    let sql = format!("SELECT {} FROM modules WHERE id = $1", MODULE_COLUMNS);
    Ok(sqlx::query_as::<_, Module>(&sql).bind(id).fetch_optional(pool).await?)
}

/// Insert a module; without an explicit position it goes after the last one
pub async fn create(
    pool: &PgPool,
    course_id: Uuid,
    title: &str,
    body: Option<&str>,
    position: Option<i32>,
) -> Result<Module, DatabaseError> {
    let sql = format!(
        "INSERT INTO modules (course_id, title, body, position)
         VALUES ($1, $2, $3, COALESCE($4, (SELECT COALESCE(MAX(position) + 1, 0) FROM modules WHERE course_id = $1)))
         RETURNING {}",
        MODULE_COLUMNS
    );
    Ok(sqlx::query_as::<_, Module>(&sql)
        .bind(course_id)
        .bind(title.trim())
        .bind(body)
        .bind(position)
        .fetch_one(pool)
        .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: ModuleUpdate) -> Result<Module, DatabaseError> {
    let sql = format!(
        "UPDATE modules SET
            title = COALESCE($2, title),
            body = COALESCE($3, body),
            position = COALESCE($4, position),
            updated_at = now()
         WHERE id = $1
         RETURNING {}",
        MODULE_COLUMNS
    );
    sqlx::query_as::<_, Module>(&sql)
        .bind(id)
        .bind(changes.title.as_deref().map(str::trim))
        .bind(changes.body)
        .bind(changes.position)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Module {} not found", id)))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM modules WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Module {} not found", id)));
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::Assignment;
use crate::database::DatabaseError;

const ASSIGNMENT_COLUMNS: &str =
    "id, course_id, module_id, title, description, points, due_at, created_at, updated_at";

#[derive(Debug)]
pub struct NewAssignment {
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub points: i32,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct AssignmentUpdate {
    pub module_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<i32>,
    pub due_at: Option<DateTime<Utc>>,
}

pub async fn list(pool: &PgPool, course_id: Uuid, page: Page) -> Result<Vec<Assignment>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM assignments WHERE course_id = $1
         ORDER BY due_at NULLS LAST, created_at
         LIMIT $2 OFFSET $3",
        ASSIGNMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Assignment>(&sql)
        .bind(course_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Assignment>, DatabaseError> {
    let sql = format!("SELECT {} FROM assignments WHERE id = $1", ASSIGNMENT_COLUMNS);
    Ok(sqlx::query_as::<_, Assignment>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create(pool: &PgPool, new: NewAssignment) -> Result<Assignment, DatabaseError> {
    let sql = format!(
        "INSERT INTO assignments (course_id, module_id, title, description, points, due_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {}",
        ASSIGNMENT_COLUMNS
    );
    let assignment = sqlx::query_as::<_, Assignment>(&sql)
        .bind(new.course_id)
        .bind(new.module_id)
        .bind(new.title.trim())
        .bind(new.description)
        .bind(new.points)
        .bind(new.due_at)
        .fetch_one(pool)
        .await?;

    tracing::info!("Created assignment {} in course {}", assignment.id, assignment.course_id);
    Ok(assignment)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: AssignmentUpdate) -> Result<Assignment, DatabaseError> {
    let sql = format!(
        "UPDATE assignments SET
            module_id = COALESCE($2, module_id),
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            points = COALESCE($5, points),
            due_at = COALESCE($6, due_at),
            updated_at = now()
         WHERE id = $1
         RETURNING {}",
        ASSIGNMENT_COLUMNS
    );
    sqlx::query_as::<_, Assignment>(&sql)
        .bind(id)
        .bind(changes.module_id)
        .bind(changes.title.as_deref().map(str::trim))
        .bind(changes.description)
        .bind(changes.points)
        .bind(changes.due_at)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Assignment {} not found", id)))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Assignment {} not found", id)));
    }
    Ok(())
}

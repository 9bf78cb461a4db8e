use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::auth::Role;
use crate::database::models::{Course, Enrollment, ProgressSummary};
use crate::database::DatabaseError;
use crate::middleware::auth::AuthUser;

const COURSE_COLUMNS: &str = "c.id, c.teacher_id, c.title, c.description, c.status, c.created_at, c.updated_at";

#[derive(Debug, Default)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Courses visible to `user`: everything for admins, owned courses for
/// teachers, enrolled courses for students, children's courses for parents.
pub async fn list_for(pool: &PgPool, user: &AuthUser, page: Page) -> Result<Vec<Course>, DatabaseError> {
    let filter = match user.role {
        Role::Admin => "TRUE",
        Role::Teacher => "c.teacher_id = $3",
        Role::Student => "EXISTS (SELECT 1 FROM enrollments e WHERE e.course_id = c.id AND e.student_id = $3)",
        Role::Parent => {
            "EXISTS (SELECT 1 FROM enrollments e JOIN parent_links p ON p.student_id = e.student_id
                     WHERE e.course_id = c.id AND p.parent_id = $3)"
        }
    };

    let sql = format!(
        "SELECT {} FROM courses c WHERE {} ORDER BY c.created_at DESC LIMIT $1 OFFSET $2",
        COURSE_COLUMNS, filter
    );

    let mut query = sqlx::query_as::<_, Course>(&sql).bind(page.limit).bind(page.offset);
    if user.role != Role::Admin {
        query = query.bind(user.id);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Course>, DatabaseError> {
    let sql = format!("SELECT {} FROM courses c WHERE c.id = $1", COURSE_COLUMNS);
    Ok(sqlx::query_as::<_, Course>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create(
    pool: &PgPool,
    teacher_id: Uuid,
    title: &str,
    description: Option<&str>,
) -> Result<Course, DatabaseError> {
    let course = sqlx::query_as::<_, Course>(
        "INSERT INTO courses (teacher_id, title, description)
         VALUES ($1, $2, $3)
         RETURNING id, teacher_id, title, description, status, created_at, updated_at",
    )
    .bind(teacher_id)
    .bind(title.trim())
    .bind(description)
    .fetch_one(pool)
    .await?;

    tracing::info!("Created course {} for teacher {}", course.id, teacher_id);
    Ok(course)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: CourseUpdate) -> Result<Course, DatabaseError> {
    sqlx::query_as::<_, Course>(
        "UPDATE courses SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            status = COALESCE($4, status),
            updated_at = now()
         WHERE id = $1
         RETURNING id, teacher_id, title, description, status, created_at, updated_at",
    )
    .bind(id)
    .bind(changes.title.as_deref().map(str::trim))
    .bind(changes.description)
    .bind(changes.status)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("Course {} not found", id)))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Course {} not found", id)));
    }
    Ok(())
}

pub async fn enroll(pool: &PgPool, course_id: Uuid, student_id: Uuid) -> Result<Enrollment, DatabaseError> {
    sqlx::query_as::<_, Enrollment>(
        "INSERT INTO enrollments (course_id, student_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING
         RETURNING course_id, student_id, created_at",
    )
    .bind(course_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::Conflict("Student is already enrolled".to_string()))
}

pub async fn unenroll(pool: &PgPool, course_id: Uuid, student_id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM enrollments WHERE course_id = $1 AND student_id = $2")
        .bind(course_id)
        .bind(student_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound("Enrollment not found".to_string()));
    }
    Ok(())
}

pub async fn is_enrolled(pool: &PgPool, course_id: Uuid, student_id: Uuid) -> Result<bool, DatabaseError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM enrollments WHERE course_id = $1 AND student_id = $2)",
    )
    .bind(course_id)
    .bind(student_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Whether any child linked to `parent_id` is enrolled in the course
pub async fn has_enrolled_child(pool: &PgPool, course_id: Uuid, parent_id: Uuid) -> Result<bool, DatabaseError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (
            SELECT 1 FROM enrollments e JOIN parent_links p ON p.student_id = e.student_id
            WHERE e.course_id = $1 AND p.parent_id = $2
         )",
    )
    .bind(course_id)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub async fn enrolled_student_ids(pool: &PgPool, course_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT student_id FROM enrollments WHERE course_id = $1")
        .bind(course_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn progress(pool: &PgPool, course_id: Uuid) -> Result<Vec<ProgressSummary>, DatabaseError> {
    Ok(sqlx::query_as::<_, ProgressSummary>(
        "SELECT course_id, student_id, assignments_total, assignments_submitted, average_percent, refreshed_at
         FROM progress_summaries WHERE course_id = $1
         ORDER BY student_id",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?)
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::Submission;
use crate::database::DatabaseError;

const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, body, file_id, status, submitted_at";

pub const MAX_BODY_CHARS: usize = 50_000;

/// A submission needs a non-blank body or an attached file
pub fn has_content(body: Option<&str>, file_id: Option<Uuid>) -> bool {
    body.is_some_and(|b| !b.trim().is_empty()) || file_id.is_some()
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, DatabaseError> {
    let sql = format!("SELECT {} FROM submissions WHERE id = $1", SUBMISSION_COLUMNS);
    Ok(sqlx::query_as::<_, Submission>(&sql).bind(id).fetch_optional(pool).await?)
}

/// Create or replace the student's submission. Graded submissions are final.
pub async fn upsert(
    pool: &PgPool,
    assignment_id: Uuid,
    student_id: Uuid,
    body: Option<&str>,
    file_id: Option<Uuid>,
) -> Result<Submission, DatabaseError> {
    let sql = format!(
        "INSERT INTO submissions (assignment_id, student_id, body, file_id)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (assignment_id, student_id) DO UPDATE SET
            body = EXCLUDED.body,
            file_id = EXCLUDED.file_id,
            status = 'submitted',
            submitted_at = now()
         WHERE submissions.status <> 'graded'
         RETURNING {}",
        SUBMISSION_COLUMNS
    );
    sqlx::query_as::<_, Submission>(&sql)
        .bind(assignment_id)
        .bind(student_id)
        .bind(body)
        .bind(file_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::Conflict("Submission has already been graded".to_string()))
}

/// All submissions for an assignment, or just one student's
pub async fn list(
    pool: &PgPool,
    assignment_id: Uuid,
    student_id: Option<Uuid>,
    page: Page,
) -> Result<Vec<Submission>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM submissions
         WHERE assignment_id = $1 AND ($4::uuid IS NULL OR student_id = $4)
         ORDER BY submitted_at DESC
         LIMIT $2 OFFSET $3",
        SUBMISSION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Submission>(&sql)
        .bind(assignment_id)
        .bind(page.limit)
        .bind(page.offset)
        .bind(student_id)
        .fetch_all(pool)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bodies_need_a_file() {
        assert!(has_content(Some("essay"), None));
        assert!(has_content(None, Some(Uuid::nil())));
        assert!(has_content(Some("  "), Some(Uuid::nil())));
        assert!(!has_content(Some(""), None));
        assert!(!has_content(Some(" \n\t"), None));
        assert!(!has_content(None, None));
    }
}

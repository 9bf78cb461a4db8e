use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Grade, GradeView};
use crate::database::DatabaseError;

const GRADE_COLUMNS: &str = "id, submission_id, grader_id, score, feedback, graded_at";

/// Record (or replace) the grade and flip the submission to `graded`
pub async fn set_grade(
    pool: &PgPool,
    submission_id: Uuid,
    grader_id: Uuid,
    score: f64,
    feedback: Option<&str>,
) -> Result<Grade, DatabaseError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO grades (submission_id, grader_id, score, feedback)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (submission_id) DO UPDATE SET
            grader_id = EXCLUDED.grader_id,
            score = EXCLUDED.score,
            feedback = EXCLUDED.feedback,
            graded_at = now()
         RETURNING {}",
        GRADE_COLUMNS
    );
    let grade = sqlx::query_as::<_, Grade>(&sql)
        .bind(submission_id)
        .bind(grader_id)
        .bind(score)
        .bind(feedback)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("UPDATE submissions SET status = 'graded' WHERE id = $1")
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("Graded submission {} ({})", submission_id, score);
    Ok(grade)
}

pub async fn get(pool: &PgPool, submission_id: Uuid) -> Result<Option<Grade>, DatabaseError> {
    let sql = format!("SELECT {} FROM grades WHERE submission_id = $1", GRADE_COLUMNS);
    Ok(sqlx::query_as::<_, Grade>(&sql)
        .bind(submission_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn grades_for_student(pool: &PgPool, student_id: Uuid) -> Result<Vec<GradeView>, DatabaseError> {
    Ok(sqlx::query_as::<_, GradeView>(
        "SELECT s.id AS submission_id, a.id AS assignment_id, a.title AS assignment_title,
                c.id AS course_id, c.title AS course_title, a.points,
                g.score, g.feedback, g.graded_at
         FROM grades g
         JOIN submissions s ON s.id = g.submission_id
         JOIN assignments a ON a.id = s.assignment_id
         JOIN courses c ON c.id = a.course_id
         WHERE s.student_id = $1
         ORDER BY g.graded_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?)
}

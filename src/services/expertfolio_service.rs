use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::{Assessment, Evaluation};
use crate::database::DatabaseError;

const ASSESSMENT_COLUMNS: &str = "id, student_id, title, description, evidence_url, status, created_at, updated_at";
const EVALUATION_COLUMNS: &str = "id, assessment_id, evaluator_id, score, outcome, feedback, created_at";

/// Assessment status after an evaluation with `outcome`
pub fn status_after(outcome: &str) -> &'static str {
    match outcome {
        "revise" => "draft",
        _ => "evaluated",
    }
}

/// A student's own assessments, or (with `None`) everything awaiting or past review
pub async fn list(pool: &PgPool, student_id: Option<Uuid>, page: Page) -> Result<Vec<Assessment>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM expertfolio_assessments
         WHERE CASE WHEN $3::uuid IS NULL THEN status IN ('submitted', 'evaluated') ELSE student_id = $3 END
         ORDER BY updated_at DESC
         LIMIT $1 OFFSET $2",
        ASSESSMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Assessment>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .bind(student_id)
        .fetch_all(pool)
        .await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Assessment>, DatabaseError> {
    let sql = format!("SELECT {} FROM expertfolio_assessments WHERE id = $1", ASSESSMENT_COLUMNS);
    Ok(sqlx::query_as::<_, Assessment>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create(
    pool: &PgPool,
    student_id: Uuid,
    title: &str,
    description: Option<&str>,
    evidence_url: Option<&str>,
) -> Result<Assessment, DatabaseError> {
    let sql = format!(
        "INSERT INTO expertfolio_assessments (student_id, title, description, evidence_url)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        ASSESSMENT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Assessment>(&sql)
        .bind(student_id)
        .bind(title.trim())
        .bind(description)
        .bind(evidence_url)
        .fetch_one(pool)
        .await?)
}

pub async fn submit(pool: &PgPool, id: Uuid) -> Result<Assessment, DatabaseError> {
    let sql = format!(
        "UPDATE expertfolio_assessments SET status = 'submitted', updated_at = now()
         WHERE id = $1 AND status = 'draft'
         RETURNING {}",
        ASSESSMENT_COLUMNS
    );
    sqlx::query_as::<_, Assessment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::Conflict("Only draft assessments can be submitted".to_string()))
}

/// Record an evaluation on a submitted assessment and move it on
pub async fn evaluate(
    pool: &PgPool,
    assessment_id: Uuid,
    evaluator_id: Uuid,
    score: i32,
    outcome: &str,
    feedback: Option<&str>,
) -> Result<Evaluation, DatabaseError> {
    let mut tx = pool.begin().await?;

    let status: Option<(String,)> =
        sqlx::query_as("SELECT status FROM expertfolio_assessments WHERE id = $1 FOR UPDATE")
            .bind(assessment_id)
            .fetch_optional(&mut *tx)
            .await?;
    match status {
        None => return Err(DatabaseError::NotFound(format!("Assessment {} not found", assessment_id))),
        Some((status,)) if status != "submitted" => {
            return Err(DatabaseError::Conflict("Only submitted assessments can be evaluated".to_string()))
        }
        Some(_) => {}
    }

    let sql = format!(
        "INSERT INTO expertfolio_evaluations (assessment_id, evaluator_id, score, outcome, feedback)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        EVALUATION_COLUMNS
    );
    let evaluation = sqlx::query_as::<_, Evaluation>(&sql)
        .bind(assessment_id)
        .bind(evaluator_id)
        .bind(score)
        .bind(outcome)
        .bind(feedback)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("UPDATE expertfolio_assessments SET status = $2, updated_at = now() WHERE id = $1")
        .bind(assessment_id)
        .bind(status_after(outcome))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(evaluation)
}

pub async fn evaluations(pool: &PgPool, assessment_id: Uuid) -> Result<Vec<Evaluation>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM expertfolio_evaluations WHERE assessment_id = $1 ORDER BY created_at DESC",
        EVALUATION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Evaluation>(&sql).bind(assessment_id).fetch_all(pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revise_sends_back_to_draft() {
        assert_eq!(status_after("revise"), "draft");
        assert_eq!(status_after("pass"), "evaluated");
        assert_eq!(status_after("fail"), "evaluated");
    }
}

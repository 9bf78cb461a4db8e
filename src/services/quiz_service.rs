use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::{Quiz, QuizAttempt, QuizQuestion};
use crate::database::DatabaseError;

/// Allowance past the time limit for network latency on submit
pub const SUBMIT_GRACE_SECS: i64 = 30;

const QUIZ_COLUMNS: &str = "id, course_id, title, time_limit_secs, max_attempts, published, created_at";
const QUESTION_COLUMNS: &str = "id, quiz_id, position, prompt, choices, correct_index, points";
const ATTEMPT_COLUMNS: &str = "id, quiz_id, student_id, started_at, submitted_at, answers, score";

/// Sum of points for questions answered with the correct choice
pub fn score_answers(questions: &[QuizQuestion], answers: &[Option<i32>]) -> f64 {
    questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| a.is_some() && q.correct_index == **a)
        .map(|(q, _)| f64::from(q.points))
        .sum()
}

/// Whether a submission at `now` still counts for an attempt started at `started_at`
pub fn within_time_limit(started_at: DateTime<Utc>, time_limit_secs: Option<i32>, now: DateTime<Utc>) -> bool {
    match time_limit_secs {
        None => true,
        Some(limit) => now <= started_at + Duration::seconds(i64::from(limit) + SUBMIT_GRACE_SECS),
    }
}

/// Strip answer keys before handing questions to students
pub fn hide_answers(questions: &mut [QuizQuestion]) {
    for question in questions {
        question.correct_index = None;
    }
}

pub async fn list(pool: &PgPool, course_id: Uuid, published_only: bool, page: Page) -> Result<Vec<Quiz>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM quizzes
         WHERE course_id = $1 AND (NOT $4::boolean OR published)
         ORDER BY created_at
         LIMIT $2 OFFSET $3",
        QUIZ_COLUMNS
    );
    Ok(sqlx::query_as::<_, Quiz>(&sql)
        .bind(course_id)
        .bind(page.limit)
        .bind(page.offset)
        .bind(published_only)
        .fetch_all(pool)
        .await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Quiz>, DatabaseError> {
    let sql = format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS);
    Ok(sqlx::query_as::<_, Quiz>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn create(
    pool: &PgPool,
    course_id: Uuid,
    title: &str,
    time_limit_secs: Option<i32>,
    max_attempts: i32,
) -> Result<Quiz, DatabaseError> {
    let sql = format!(
        "INSERT INTO quizzes (course_id, title, time_limit_secs, max_attempts)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        QUIZ_COLUMNS
    );
    Ok(sqlx::query_as::<_, Quiz>(&sql)
        .bind(course_id)
        .bind(title.trim())
        .bind(time_limit_secs)
        .bind(max_attempts)
        .fetch_one(pool)
        .await?)
}

pub async fn questions(pool: &PgPool, quiz_id: Uuid) -> Result<Vec<QuizQuestion>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM quiz_questions WHERE quiz_id = $1 ORDER BY position",
        QUESTION_COLUMNS
    );
    Ok(sqlx::query_as::<_, QuizQuestion>(&sql).bind(quiz_id).fetch_all(pool).await?)
}

pub async fn add_question(
    pool: &PgPool,
    quiz_id: Uuid,
    prompt: &str,
    choices: Vec<String>,
    correct_index: i32,
    points: i32,
) -> Result<QuizQuestion, DatabaseError> {
    let sql = format!(
        "INSERT INTO quiz_questions (quiz_id, position, prompt, choices, correct_index, points)
         VALUES ($1, (SELECT COALESCE(MAX(position) + 1, 0) FROM quiz_questions WHERE quiz_id = $1), $2, $3, $4, $5)
         RETURNING {}",
        QUESTION_COLUMNS
    );
    Ok(sqlx::query_as::<_, QuizQuestion>(&sql)
        .bind(quiz_id)
        .bind(prompt.trim())
        .bind(Json(choices))
        .bind(correct_index)
        .bind(points)
        .fetch_one(pool)
        .await?)
}

pub async fn publish(pool: &PgPool, id: Uuid) -> Result<Quiz, DatabaseError> {
    let sql = format!("UPDATE quizzes SET published = true WHERE id = $1 RETURNING {}", QUIZ_COLUMNS);
    sqlx::query_as::<_, Quiz>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Quiz {} not found", id)))
}

/// Start an attempt, or hand back the one already open.
/// Returns the attempt and whether it was newly created.
pub async fn start_attempt(pool: &PgPool, quiz: &Quiz, student_id: Uuid) -> Result<(QuizAttempt, bool), DatabaseError> {
    let mut tx = pool.begin().await?;

    // Serialise attempt creation per quiz
    sqlx::query("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
        .bind(quiz.id)
        .execute(&mut *tx)
        .await?;

    let sql = format!(
        "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2 ORDER BY started_at",
        ATTEMPT_COLUMNS
    );
    let existing = sqlx::query_as::<_, QuizAttempt>(&sql)
        .bind(quiz.id)
        .bind(student_id)
        .fetch_all(&mut *tx)
        .await?;

    if let Some(open) = existing.iter().find(|a| a.submitted_at.is_none()) {
        tx.commit().await?;
        return Ok((open.clone(), false));
    }

    if existing.len() as i64 >= i64::from(quiz.max_attempts) {
        return Err(DatabaseError::Conflict(format!(
            "Maximum of {} attempt(s) reached",
            quiz.max_attempts
        )));
    }

    let sql = format!(
        "INSERT INTO quiz_attempts (quiz_id, student_id) VALUES ($1, $2) RETURNING {}",
        ATTEMPT_COLUMNS
    );
    let attempt = sqlx::query_as::<_, QuizAttempt>(&sql)
        .bind(quiz.id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((attempt, true))
}

pub async fn get_attempt(pool: &PgPool, id: Uuid) -> Result<Option<QuizAttempt>, DatabaseError> {
    let sql = format!("SELECT {} FROM quiz_attempts WHERE id = $1", ATTEMPT_COLUMNS);
    Ok(sqlx::query_as::<_, QuizAttempt>(&sql).bind(id).fetch_optional(pool).await?)
}

/// Close an open attempt with its answers and score
pub async fn submit_attempt(
    pool: &PgPool,
    id: Uuid,
    answers: Vec<Option<i32>>,
    score: f64,
) -> Result<QuizAttempt, DatabaseError> {
    let sql = format!(
        "UPDATE quiz_attempts SET submitted_at = now(), answers = $2, score = $3
         WHERE id = $1 AND submitted_at IS NULL
         RETURNING {}",
        ATTEMPT_COLUMNS
    );
    sqlx::query_as::<_, QuizAttempt>(&sql)
        .bind(id)
        .bind(Json(answers))
        .bind(score)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::Conflict("Attempt has already been submitted".to_string()))
}

pub async fn list_attempts(
    pool: &PgPool,
    quiz_id: Uuid,
    student_id: Option<Uuid>,
    page: Page,
) -> Result<Vec<QuizAttempt>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM quiz_attempts
         WHERE quiz_id = $1 AND ($4::uuid IS NULL OR student_id = $4)
         ORDER BY started_at DESC
         LIMIT $2 OFFSET $3",
        ATTEMPT_COLUMNS
    );
    Ok(sqlx::query_as::<_, QuizAttempt>(&sql)
        .bind(quiz_id)
        .bind(page.limit)
        .bind(page.offset)
        .bind(student_id)
        .fetch_all(pool)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: i32, points: i32) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            quiz_id: Uuid::nil(),
            position: 0,
            prompt: "?".into(),
            choices: Json(vec!["a".into(), "b".into(), "c".into()]),
            correct_index: Some(correct),
            points,
        }
    }

    #[test]
    fn scores_correct_answers_only() {
        let questions = vec![question(0, 2), question(2, 3), question(1, 5)];
        assert_eq!(score_answers(&questions, &[Some(0), Some(2), Some(1)]), 10.0);
        assert_eq!(score_answers(&questions, &[Some(0), None, Some(0)]), 2.0);
        assert_eq!(score_answers(&questions, &[None, None, None]), 0.0);
    }

    #[test]
    fn time_limit_includes_grace() {
        let start = Utc::now();
        assert!(within_time_limit(start, None, start + Duration::days(3)));
        assert!(within_time_limit(start, Some(60), start + Duration::seconds(90)));
        assert!(!within_time_limit(start, Some(60), start + Duration::seconds(91)));
    }

    #[test]
    fn hides_answer_keys() {
        let mut questions = vec![question(1, 1)];
        hide_answers(&mut questions);
        assert_eq!(questions[0].correct_index, None);
        let json = serde_json::to_value(&questions[0]).unwrap();
        assert!(json.get("correct_index").is_none());
    }
}

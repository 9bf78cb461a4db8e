use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::auth::Role;
use crate::database::models::{Quiz, QuizAttempt, QuizDetail, QuizQuestion};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::rate_limit::RateBudget;
use crate::services::access::{managed_course, visible_course, CourseRole};
use crate::services::quiz_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateQuiz {
    pub title: String,
    pub time_limit_secs: Option<i32>,
    pub max_attempts: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: i32,
    pub points: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttempt {
    pub answers: Vec<Option<i32>>,
}

async fn load_quiz(state: &AppState, id: Uuid) -> Result<Quiz, ApiError> {
    quiz_service::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Quiz not found"))
}

/// A quiz the caller may see; unpublished quizzes only for course managers
async fn visible_quiz(state: &AppState, user: &AuthUser, id: Uuid) -> Result<(Quiz, CourseRole), ApiError> {
    let quiz = load_quiz(state, id).await?;
    let (_, role) = visible_course(&state.pool, user, quiz.course_id).await?;
    if !quiz.published && !role.can_manage() {
        return Err(ApiError::not_found("Quiz not found"));
    }
    Ok((quiz, role))
}

/// GET /api/courses/:course_id/quizzes - students see published quizzes only
pub async fn quiz_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Quiz>> {
    state.rate_limit("quizzes:read", &user)?;
    let (_, role) = visible_course(&state.pool, &user, course_id).await?;
    let quizzes = quiz_service::list(&state.pool, course_id, !role.can_manage(), state.page(&query)).await?;
    Ok(ApiResponse::success(quizzes))
}

/// POST /api/courses/:course_id/quizzes
pub async fn quiz_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateQuiz>,
) -> ApiResult<Quiz> {
    user.require_staff()?;
    state.rate_limit("quizzes:write", &user)?;

    let max_attempts = body.max_attempts.unwrap_or(1);
    let mut v = Validator::new();
    v.text("title", &body.title, 1, 200).range("max_attempts", max_attempts, 1, 20);
    if let Some(limit) = body.time_limit_secs {
        v.range("time_limit_secs", limit, 30, 14_400);
    }
    v.finish()?;

    managed_course(&state.pool, &user, course_id).await?;
    let quiz = quiz_service::create(&state.pool, course_id, &body.title, body.time_limit_secs, max_attempts).await?;
    Ok(ApiResponse::created(quiz))
}

/// POST /api/quizzes/:id/questions
pub async fn question_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateQuestion>,
) -> ApiResult<QuizQuestion> {
    user.require_staff()?;
    state.rate_limit("quizzes:write", &user)?;

    let choice_count = body.choices.len();
    Validator::new()
        .text("prompt", &body.prompt, 1, 2000)
        .range("choices", choice_count, 2, 10)
        .check(
            "choices",
            body.choices.iter().all(|c| !c.trim().is_empty() && c.chars().count() <= 500),
            "choices must be non-empty and at most 500 characters",
        )
        .check(
            "correct_index",
            body.correct_index >= 0 && (body.correct_index as usize) < choice_count,
            "must point at one of the choices",
        )
        .range("points", body.points, 1, 100)
        .finish()?;

    let quiz = load_quiz(&state, id).await?;
    managed_course(&state.pool, &user, quiz.course_id).await?;
    let question =
        quiz_service::add_question(&state.pool, id, &body.prompt, body.choices, body.correct_index, body.points).await?;
    Ok(ApiResponse::created(question))
}

/// POST /api/quizzes/:id/publish
pub async fn quiz_publish(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Quiz> {
    user.require_staff()?;
    state.rate_limit("quizzes:write", &user)?;

    let quiz = load_quiz(&state, id).await?;
    managed_course(&state.pool, &user, quiz.course_id).await?;
    if quiz_service::questions(&state.pool, id).await?.is_empty() {
        return Err(ApiError::bad_request("A quiz needs at least one question before it can be published"));
    }
    Ok(ApiResponse::success(quiz_service::publish(&state.pool, id).await?))
}

/// GET /api/quizzes/:id - with questions; answer keys only for course managers
pub async fn quiz_get(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<QuizDetail> {
    state.rate_limit("quizzes:read", &user)?;
    let (quiz, role) = visible_quiz(&state, &user, id).await?;

    let mut questions = quiz_service::questions(&state.pool, id).await?;
    if !role.can_manage() {
        quiz_service::hide_answers(&mut questions);
    }
    Ok(ApiResponse::success(QuizDetail { quiz, questions }))
}

/// POST /api/quizzes/:id/attempts - start (or resume) an attempt
pub async fn attempt_start(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<QuizAttempt> {
    user.require_role(&[Role::Student])?;
    state.rate_limit_with("quizzes:attempt", &user, RateBudget::per_minute(20))?;

    let (quiz, role) = visible_quiz(&state, &user, id).await?;
    if role != CourseRole::Student {
        return Err(ApiError::forbidden("Only enrolled students can attempt quizzes"));
    }

    let (attempt, created) = quiz_service::start_attempt(&state.pool, &quiz, user.id).await?;
    if created {
        tracing::info!("Student {} started attempt {} on quiz {}", user.id, attempt.id, id);
        Ok(ApiResponse::with_status(attempt, StatusCode::CREATED))
    } else {
        Ok(ApiResponse::success(attempt))
    }
}

/// POST /api/attempts/:id/submit - score and close an attempt
pub async fn attempt_submit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SubmitAttempt>,
) -> ApiResult<QuizAttempt> {
    user.require_role(&[Role::Student])?;
    state.rate_limit_with("quizzes:attempt", &user, RateBudget::per_minute(20))?;

    let attempt = quiz_service::get_attempt(&state.pool, id)
        .await?
        .filter(|a| a.student_id == user.id)
        .ok_or_else(|| ApiError::not_found("Attempt not found"))?;
    if attempt.submitted_at.is_some() {
        return Err(ApiError::conflict("Attempt has already been submitted"));
    }

    let quiz = load_quiz(&state, attempt.quiz_id).await?;
    let questions = quiz_service::questions(&state.pool, quiz.id).await?;
    if body.answers.len() != questions.len() {
        return Err(ApiError::invalid_field(
            "answers",
            format!("expected {} answers, got {}", questions.len(), body.answers.len()),
        ));
    }
    if !quiz_service::within_time_limit(attempt.started_at, quiz.time_limit_secs, Utc::now()) {
        return Err(ApiError::conflict("Time limit for this attempt has passed"));
    }

    let score = quiz_service::score_answers(&questions, &body.answers);
    let submitted = quiz_service::submit_attempt(&state.pool, id, body.answers, score).await?;
    tracing::info!("Attempt {} submitted with score {}", id, score);
    Ok(ApiResponse::success(submitted))
}

/// GET /api/quizzes/:id/attempts
pub async fn attempt_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<QuizAttempt>> {
    state.rate_limit("quizzes:read", &user)?;
    let (_, role) = visible_quiz(&state, &user, id).await?;
    let student = match role {
        CourseRole::Admin | CourseRole::Owner => None,
        CourseRole::Student => Some(user.id),
        CourseRole::Parent => return Err(ApiError::forbidden("Attempts are visible to students and teachers")),
    };
    let attempts = quiz_service::list_attempts(&state.pool, id, student, state.page(&query)).await?;
    Ok(ApiResponse::success(attempts))
}

use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::auth::Role;
use crate::database::models::{Assessment, Evaluation};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::expertfolio_service;
use crate::state::AppState;

const OUTCOMES: &[&str] = &["pass", "revise", "fail"];

#[derive(Debug, Deserialize)]
pub struct CreateAssessment {
    pub title: String,
    pub description: Option<String>,
    pub evidence_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEvaluation {
    pub score: i32,
    pub outcome: String,
    pub feedback: Option<String>,
}

/// Owners see their own assessments; staff see all of them
async fn visible_assessment(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Assessment, ApiError> {
    let staff = user.is_staff();
    expertfolio_service::get(&state.pool, id)
        .await?
        .filter(|a| a.student_id == user.id || staff)
        .ok_or_else(|| ApiError::not_found("Assessment not found"))
}

/// GET /api/expertfolio/assessments
pub async fn assessment_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Assessment>> {
    state.rate_limit("expertfolio:read", &user)?;
    let student = match user.role {
        Role::Student => Some(user.id),
        Role::Teacher | Role::Admin => None,
        Role::Parent => return Err(ApiError::forbidden("Assessments are not available to parents")),
    };
    let items = expertfolio_service::list(&state.pool, student, state.page(&page)).await?;
    Ok(ApiResponse::success(items))
}

/// POST /api/expertfolio/assessments
pub async fn assessment_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateAssessment>,
) -> ApiResult<Assessment> {
    user.require_role(&[Role::Student])?;
    state.rate_limit("expertfolio:write", &user)?;

    let mut v = Validator::new();
    v.text("title", &body.title, 1, 200)
        .optional_text("description", body.description.as_deref(), 10_000);
    if let Some(url) = body.evidence_url.as_deref() {
        v.http_url("evidence_url", url);
    }
    v.finish()?;

    let assessment = expertfolio_service::create(
        &state.pool,
        user.id,
        &body.title,
        body.description.as_deref(),
        body.evidence_url.as_deref(),
    )
    .await?;
    Ok(ApiResponse::created(assessment))
}

/// POST /api/expertfolio/assessments/:id/submit - owner, drafts only
pub async fn assessment_submit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Assessment> {
    state.rate_limit("expertfolio:write", &user)?;
    let assessment = visible_assessment(&state, &user, id).await?;
    if assessment.student_id != user.id {
        return Err(ApiError::forbidden("Only the owner can submit an assessment"));
    }
    Ok(ApiResponse::success(expertfolio_service::submit(&state.pool, id).await?))
}

/// POST /api/expertfolio/assessments/:id/evaluations
pub async fn evaluation_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateEvaluation>,
) -> ApiResult<Evaluation> {
    user.require_staff()?;
    state.rate_limit("expertfolio:write", &user)?;

    Validator::new()
        .range("score", body.score, 0, 100)
        .one_of("outcome", &body.outcome, OUTCOMES)
        .optional_text("feedback", body.feedback.as_deref(), 10_000)
        .finish()?;

    let evaluation =
        expertfolio_service::evaluate(&state.pool, id, user.id, body.score, &body.outcome, body.feedback.as_deref())
            .await?;
    state
        .audit(
            &user,
            "assessment.evaluate",
            "assessment",
            Some(id),
            json!({ "score": body.score, "outcome": body.outcome }),
        )
        .await;
    Ok(ApiResponse::created(evaluation))
}

/// GET /api/expertfolio/assessments/:id/evaluations
pub async fn evaluation_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<Evaluation>> {
    state.rate_limit("expertfolio:read", &user)?;
    visible_assessment(&state, &user, id).await?;
    Ok(ApiResponse::success(expertfolio_service::evaluations(&state.pool, id).await?))
}

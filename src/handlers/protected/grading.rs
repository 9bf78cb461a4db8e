use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::Validator;
use crate::database::models::Grade;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::grading_service;
use crate::services::notification_service::{self, NotificationKind};
use crate::state::AppState;

use super::submissions::visible_submission;

#[derive(Debug, Deserialize)]
pub struct SetGrade {
    pub score: f64,
    pub feedback: Option<String>,
}

/// PUT /api/submissions/:id/grade - record the grade and notify the student
pub async fn grade_put(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SetGrade>,
) -> ApiResult<Grade> {
    user.require_staff()?;
    state.rate_limit("grades:write", &user)?;

    let ctx = visible_submission(&state, &user, id).await?;
    if !ctx.can_grade(&user) {
        return Err(ApiError::forbidden("Only the course teacher or an admin can grade"));
    }

    Validator::new()
        .check("score", body.score.is_finite(), "must be a number")
        .range("score", body.score, 0.0, f64::from(ctx.assignment.points))
        .optional_text("feedback", body.feedback.as_deref(), 10_000)
        .finish()?;

    let grade = grading_service::set_grade(&state.pool, id, user.id, body.score, body.feedback.as_deref()).await?;

    if let Err(e) = notification_service::notify(
        &state.pool,
        ctx.submission.student_id,
        NotificationKind::GradePosted,
        &format!("Grade posted: {}", ctx.assignment.title),
        None,
        json!({
            "submission_id": id,
            "assignment_id": ctx.assignment.id,
            "course_id": ctx.course.id,
            "score": grade.score,
            "points": ctx.assignment.points,
        }),
    )
    .await
    {
        tracing::error!("Failed to notify student {} of grade: {}", ctx.submission.student_id, e);
    }

    state
        .audit(&user, "grade.set", "submission", Some(id), json!({ "score": grade.score }))
        .await;
    Ok(ApiResponse::success(grade))
}

/// GET /api/submissions/:id/grade
pub async fn grade_get(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Grade> {
    state.rate_limit("grades:read", &user)?;
    visible_submission(&state, &user, id).await?;
    let grade = grading_service::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Submission has not been graded"))?;
    Ok(ApiResponse::success(grade))
}

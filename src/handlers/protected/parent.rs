use axum::extract::State;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::models::{GradeView, Profile};
use crate::error::ApiError;
use crate::middleware::{ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::{grading_service, parent_service};
use crate::state::AppState;

/// GET /api/parent/children
pub async fn children(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<Profile>> {
    user.require_role(&[Role::Parent])?;
    state.rate_limit("parent:read", &user)?;
    Ok(ApiResponse::success(parent_service::children(&state.pool, user.id).await?))
}

/// GET /api/parent/children/:student_id/grades
pub async fn child_grades(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(student_id): ApiPath<Uuid>,
) -> ApiResult<Vec<GradeView>> {
    user.require_role(&[Role::Parent])?;
    state.rate_limit("parent:read", &user)?;

    // Unlinked students are indistinguishable from unknown ones
    if !parent_service::is_linked(&state.pool, user.id, student_id).await? {
        return Err(ApiError::not_found("Student not found"));
    }
    Ok(ApiResponse::success(grading_service::grades_for_student(&state.pool, student_id).await?))
}

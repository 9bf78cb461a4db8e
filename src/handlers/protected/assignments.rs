use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::database::models::Assignment;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::access::{managed_course, visible_course};
use crate::services::assignment_service::{self, AssignmentUpdate, NewAssignment};
use crate::services::module_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAssignment {
    pub title: String,
    pub description: Option<String>,
    pub points: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub module_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<i32>,
    pub due_at: Option<DateTime<Utc>>,
    pub module_id: Option<Uuid>,
}

async fn check_module(state: &AppState, course_id: Uuid, module_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(module_id) = module_id {
        let module = module_service::get(&state.pool, module_id).await?;
        if module.map(|m| m.course_id) != Some(course_id) {
            return Err(ApiError::invalid_field("module_id", "must belong to this course"));
        }
    }
    Ok(())
}

pub(super) async fn load_assignment(state: &AppState, id: Uuid) -> Result<Assignment, ApiError> {
    assignment_service::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment not found"))
}

/// GET /api/courses/:course_id/assignments
pub async fn assignment_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Assignment>> {
    state.rate_limit("assignments:read", &user)?;
    visible_course(&state.pool, &user, course_id).await?;
    let assignments = assignment_service::list(&state.pool, course_id, state.page(&query)).await?;
    Ok(ApiResponse::success(assignments))
}

/// POST /api/courses/:course_id/assignments
pub async fn assignment_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateAssignment>,
) -> ApiResult<Assignment> {
    user.require_staff()?;
    state.rate_limit("assignments:write", &user)?;
    Validator::new()
        .text("title", &body.title, 1, 200)
        .optional_text("description", body.description.as_deref(), 20_000)
        .range("points", body.points, 1, 1000)
        .finish()?;

    managed_course(&state.pool, &user, course_id).await?;
    check_module(&state, course_id, body.module_id).await?;

    let assignment = assignment_service::create(
        &state.pool,
        NewAssignment {
            course_id,
            module_id: body.module_id,
            title: body.title,
            description: body.description,
            points: body.points,
            due_at: body.due_at,
        },
    )
    .await?;
    state
        .audit(&user, "assignment.create", "assignment", Some(assignment.id), json!({ "course_id": course_id }))
        .await;
    Ok(ApiResponse::created(assignment))
}

/// PATCH /api/assignments/:id
pub async fn assignment_update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateAssignment>,
) -> ApiResult<Assignment> {
    user.require_staff()?;
    state.rate_limit("assignments:write", &user)?;

    let mut v = Validator::new();
    if let Some(title) = &body.title {
        v.text("title", title, 1, 200);
    }
    if let Some(points) = body.points {
        v.range("points", points, 1, 1000);
    }
    v.optional_text("description", body.description.as_deref(), 20_000).finish()?;

    let assignment = load_assignment(&state, id).await?;
    managed_course(&state.pool, &user, assignment.course_id).await?;
    check_module(&state, assignment.course_id, body.module_id).await?;

    let updated = assignment_service::update(
        &state.pool,
        id,
        AssignmentUpdate {
            module_id: body.module_id,
            title: body.title,
            description: body.description,
            points: body.points,
            due_at: body.due_at,
        },
    )
    .await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/assignments/:id
pub async fn assignment_delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    user.require_staff()?;
    state.rate_limit("assignments:write", &user)?;

    let assignment = load_assignment(&state, id).await?;
    managed_course(&state.pool, &user, assignment.course_id).await?;
    assignment_service::delete(&state.pool, id).await?;
    state
        .audit(&user, "assignment.delete", "assignment", Some(id), json!({ "course_id": assignment.course_id }))
        .await;
    Ok(ApiResponse::no_content())
}

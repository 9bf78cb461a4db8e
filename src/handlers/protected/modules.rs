use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Validator;
use crate::database::models::Module;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::access::{managed_course, visible_course};
use crate::services::module_service::{self, ModuleUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateModule {
    pub title: String,
    pub body: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModule {
    pub title: Option<String>,
    pub body: Option<String>,
    pub position: Option<i32>,
}

async fn managed_module(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Module, ApiError> {
    let module = module_service::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Module not found"))?;
    managed_course(&state.pool, user, module.course_id).await?;
    Ok(module)
}

/// GET /api/courses/:course_id/modules - ordered by position
pub async fn module_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Module>> {
    state.rate_limit("modules:read", &user)?;
    visible_course(&state.pool, &user, course_id).await?;
    Ok(ApiResponse::success(module_service::list(&state.pool, course_id).await?))
}

/// POST /api/courses/:course_id/modules
pub async fn module_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateModule>,
) -> ApiResult<Module> {
    user.require_staff()?;
    state.rate_limit("modules:write", &user)?;
    Validator::new()
        .text("title", &body.title, 1, 200)
        .optional_text("body", body.body.as_deref(), 50_000)
        .check("position", body.position.map_or(true, |p| p >= 0), "must not be negative")
        .finish()?;

    managed_course(&state.pool, &user, course_id).await?;
    let module = module_service::create(&state.pool, course_id, &body.title, body.body.as_deref(), body.position).await?;
    Ok(ApiResponse::created(module))
}

/// PATCH /api/modules/:id
pub async fn module_update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateModule>,
) -> ApiResult<Module> {
    user.require_staff()?;
    state.rate_limit("modules:write", &user)?;

    let mut v = Validator::new();
    if let Some(title) = &body.title {
        v.text("title", title, 1, 200);
    }
    v.optional_text("body", body.body.as_deref(), 50_000)
        .check("position", body.position.map_or(true, |p| p >= 0), "must not be negative")
        .finish()?;

    managed_module(&state, &user, id).await?;
    let module = module_service::update(
        &state.pool,
        id,
        ModuleUpdate {
            title: body.title,
            body: body.body,
            position: body.position,
        },
    )
    .await?;
    Ok(ApiResponse::success(module))
}

/// DELETE /api/modules/:id
pub async fn module_delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    user.require_staff()?;
    state.rate_limit("modules:write", &user)?;
    managed_module(&state, &user, id).await?;
    module_service::delete(&state.pool, id).await?;
    Ok(ApiResponse::no_content())
}

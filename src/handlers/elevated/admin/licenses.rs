use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::database::models::License;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::license_service::{self, LicenseUpdate};
use crate::services::registry_service;
use crate::state::AppState;

const STATUSES: &[&str] = &["active", "suspended", "revoked"];

#[derive(Debug, Deserialize)]
pub struct CreateLicense {
    pub registry_course_id: Uuid,
    pub holder: String,
    pub seats: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLicense {
    pub seats: Option<i32>,
    pub status: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// GET /api/admin/licenses
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<License>> {
    user.require_admin()?;
    state.rate_limit("admin:read", &user)?;
    Ok(ApiResponse::success(license_service::list(&state.pool, state.page(&page)).await?))
}

/// POST /api/admin/licenses
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateLicense>,
) -> ApiResult<License> {
    user.require_admin()?;
    state.rate_limit("admin:write", &user)?;

    Validator::new()
        .text("holder", &body.holder, 1, 200)
        .range("seats", body.seats, 1, 100_000)
        .finish()?;

    if registry_service::get_course(&state.pool, body.registry_course_id).await?.is_none() {
        return Err(ApiError::not_found("Registry course not found"));
    }

    let license =
        license_service::create(&state.pool, body.registry_course_id, &body.holder, body.seats, body.expires_at).await?;
    state
        .audit(&user, "license.create", "license", Some(license.id), json!({ "seats": license.seats, "holder": license.holder }))
        .await;
    Ok(ApiResponse::created(license))
}

/// PATCH /api/admin/licenses/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateLicense>,
) -> ApiResult<License> {
    user.require_admin()?;
    state.rate_limit("admin:write", &user)?;

    let mut v = Validator::new();
    if let Some(seats) = body.seats {
        v.range("seats", seats, 1, 100_000);
    }
    if let Some(status) = body.status.as_deref() {
        v.one_of("status", status, STATUSES);
    }
    v.finish()?;

    let changes = LicenseUpdate {
        seats: body.seats,
        status: body.status,
        expires_at: body.expires_at,
    };
    let license = license_service::update(&state.pool, id, changes).await?;
    state
        .audit(&user, "license.update", "license", Some(id), json!({ "seats": license.seats, "status": license.status }))
        .await;
    Ok(ApiResponse::success(license))
}

/// POST /api/admin/licenses/:id/assign - consume one seat
pub async fn assign(State(state): State<AppState>, user: AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<License> {
    user.require_admin()?;
    state.rate_limit("admin:write", &user)?;
    let license = license_service::assign_seat(&state.pool, id).await?;
    state
        .audit(&user, "license.assign", "license", Some(id), json!({ "seats_used": license.seats_used }))
        .await;
    Ok(ApiResponse::success(license))
}

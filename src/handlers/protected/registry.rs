use axum::extract::State;
use semver::Version;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::database::models::{ProviderHealth, RegistryCourse, RegistryVersion};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::registry_service::{self, NewRegistryCourse, RegistryCourseUpdate};
use crate::state::AppState;

const COURSE_STATUSES: &[&str] = &["draft", "published", "archived"];
const DECISIONS: &[&str] = &["approved", "rejected"];

#[derive(Debug, Default, Deserialize)]
pub struct RegistryFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRegistryCourse {
    pub external_id: String,
    pub provider: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRegistryCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVersion {
    pub version: String,
    pub manifest: Value,
}

#[derive(Debug, Deserialize)]
pub struct ReviewVersion {
    pub decision: String,
}

/// Registry course as the caller may see it; drafts and archives are staff only
async fn visible_registry_course(state: &AppState, user: &AuthUser, id: Uuid) -> Result<RegistryCourse, ApiError> {
    registry_service::get_course(&state.pool, id)
        .await?
        .filter(|c| user.is_staff() || c.status == "published")
        .ok_or_else(|| ApiError::not_found("Registry course not found"))
}

/// GET /api/registry/courses?status=
pub async fn course_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<RegistryFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<RegistryCourse>> {
    state.rate_limit("registry:read", &user)?;

    if let Some(status) = filter.status.as_deref() {
        Validator::new().one_of("status", status, COURSE_STATUSES).finish()?;
    }
    let status = if user.is_staff() { filter.status.as_deref() } else { Some("published") };
    let courses = registry_service::list_courses(&state.pool, status, state.page(&page)).await?;
    Ok(ApiResponse::success(courses))
}

/// POST /api/registry/courses
pub async fn course_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateRegistryCourse>,
) -> ApiResult<RegistryCourse> {
    user.require_admin()?;
    state.rate_limit("registry:write", &user)?;

    Validator::new()
        .text("external_id", &body.external_id, 1, 128)
        .text("provider", &body.provider, 1, 128)
        .text("title", &body.title, 1, 200)
        .optional_text("description", body.description.as_deref(), 10_000)
        .finish()?;

    let course = registry_service::create_course(
        &state.pool,
        NewRegistryCourse {
            external_id: body.external_id,
            provider: body.provider,
            title: body.title,
            description: body.description,
            created_by: user.id,
        },
    )
    .await?;

    state
        .audit(&user, "registry_course.create", "registry_course", Some(course.id), json!({ "external_id": course.external_id }))
        .await;
    Ok(ApiResponse::created(course))
}

/// GET /api/registry/courses/:id
pub async fn course_get(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<RegistryCourse> {
    state.rate_limit("registry:read", &user)?;
    Ok(ApiResponse::success(visible_registry_course(&state, &user, id).await?))
}

/// PATCH /api/registry/courses/:id
pub async fn course_update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateRegistryCourse>,
) -> ApiResult<RegistryCourse> {
    user.require_admin()?;
    state.rate_limit("registry:write", &user)?;

    let mut v = Validator::new();
    if let Some(title) = body.title.as_deref() {
        v.text("title", title, 1, 200);
    }
    if let Some(status) = body.status.as_deref() {
        v.one_of("status", status, COURSE_STATUSES);
    }
    v.optional_text("description", body.description.as_deref(), 10_000).finish()?;

    let changes = RegistryCourseUpdate {
        title: body.title,
        description: body.description,
        status: body.status,
    };
    let course = registry_service::update_course(&state.pool, id, changes).await?;
    state
        .audit(&user, "registry_course.update", "registry_course", Some(id), json!({ "status": course.status }))
        .await;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/registry/courses/:id
pub async fn course_delete(State(state): State<AppState>, user: AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    user.require_admin()?;
    state.rate_limit("registry:write", &user)?;
    registry_service::delete_course(&state.pool, id).await?;
    state.audit(&user, "registry_course.delete", "registry_course", Some(id), json!({})).await;
    Ok(ApiResponse::no_content())
}

/// GET /api/registry/courses/:id/versions - newest first
pub async fn version_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<RegistryVersion>> {
    state.rate_limit("registry:read", &user)?;
    visible_registry_course(&state, &user, id).await?;
    Ok(ApiResponse::success(registry_service::list_versions(&state.pool, id).await?))
}

/// POST /api/registry/courses/:id/versions
pub async fn version_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateVersion>,
) -> ApiResult<RegistryVersion> {
    user.require_staff()?;
    state.rate_limit("registry:write", &user)?;

    let parsed = Version::parse(body.version.trim());
    Validator::new()
        .check("version", parsed.is_ok(), "must be a semantic version such as 1.2.0")
        .check("manifest", body.manifest.is_object(), "must be a JSON object")
        .finish()?;
    let version = parsed.map_err(|e| ApiError::invalid_field("version", e.to_string()))?;

    let created = registry_service::create_version(&state.pool, id, &version, body.manifest, user.id).await?;
    state
        .audit(&user, "registry_version.create", "registry_course", Some(id), json!({ "version": created.version }))
        .await;
    Ok(ApiResponse::created(created))
}

/// POST /api/registry/versions/:id/review
pub async fn version_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReviewVersion>,
) -> ApiResult<RegistryVersion> {
    user.require_admin()?;
    state.rate_limit("registry:write", &user)?;
    Validator::new().one_of("decision", &body.decision, DECISIONS).finish()?;

    let reviewed = registry_service::review_version(&state.pool, id, &body.decision, user.id).await?;
    state
        .audit(&user, "registry_version.review", "registry_version", Some(id), json!({ "decision": body.decision }))
        .await;
    Ok(ApiResponse::success(reviewed))
}

/// GET /api/registry/providers - with the latest health check per provider
pub async fn provider_list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<ProviderHealth>> {
    user.require_admin()?;
    state.rate_limit("registry:read", &user)?;
    Ok(ApiResponse::success(registry_service::providers_with_health(&state.pool).await?))
}

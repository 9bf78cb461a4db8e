use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::auth::Role;
use crate::database::models::{Course, Enrollment, ProgressSummary};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::access::{managed_course, visible_course};
use crate::services::course_service::{self, CourseUpdate};
use crate::services::profile_service;
use crate::state::AppState;

const COURSE_STATUSES: &[&str] = &["active", "archived"];

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEnrollment {
    pub student_id: Uuid,
}

/// GET /api/courses - courses visible to the caller
pub async fn course_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Course>> {
    state.rate_limit("courses:read", &user)?;
    let courses = course_service::list_for(&state.pool, &user, state.page(&query)).await?;
    Ok(ApiResponse::success(courses))
}

/// POST /api/courses - create a course owned by the caller
pub async fn course_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateCourse>,
) -> ApiResult<Course> {
    user.require_staff()?;
    state.rate_limit("courses:write", &user)?;
    Validator::new()
        .text("title", &body.title, 1, 200)
        .optional_text("description", body.description.as_deref(), 5000)
        .finish()?;

    let course = course_service::create(&state.pool, user.id, &body.title, body.description.as_deref()).await?;
    state
        .audit(&user, "course.create", "course", Some(course.id), json!({ "title": course.title }))
        .await;
    Ok(ApiResponse::created(course))
}

/// GET /api/courses/:id
pub async fn course_get(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Course> {
    state.rate_limit("courses:read", &user)?;
    let (course, _) = visible_course(&state.pool, &user, id).await?;
    Ok(ApiResponse::success(course))
}

/// PATCH /api/courses/:id
pub async fn course_update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateCourse>,
) -> ApiResult<Course> {
    user.require_staff()?;
    state.rate_limit("courses:write", &user)?;

    let mut v = Validator::new();
    if let Some(title) = &body.title {
        v.text("title", title, 1, 200);
    }
    if let Some(status) = &body.status {
        v.one_of("status", status, COURSE_STATUSES);
    }
    v.optional_text("description", body.description.as_deref(), 5000).finish()?;

    managed_course(&state.pool, &user, id).await?;
    let course = course_service::update(
        &state.pool,
        id,
        CourseUpdate {
            title: body.title,
            description: body.description,
            status: body.status,
        },
    )
    .await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/courses/:id
pub async fn course_delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    user.require_staff()?;
    state.rate_limit("courses:write", &user)?;

    let course = managed_course(&state.pool, &user, id).await?;
    course_service::delete(&state.pool, id).await?;
    state
        .audit(&user, "course.delete", "course", Some(id), json!({ "title": course.title }))
        .await;
    Ok(ApiResponse::no_content())
}

/// POST /api/courses/:id/enrollments - enroll a student
pub async fn enrollment_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateEnrollment>,
) -> ApiResult<Enrollment> {
    user.require_staff()?;
    state.rate_limit("enrollments:write", &user)?;
    managed_course(&state.pool, &user, id).await?;

    let student = profile_service::get(&state.pool, body.student_id).await?;
    if student.as_ref().and_then(|p| p.role()) != Some(Role::Student) {
        return Err(ApiError::invalid_field("student_id", "must reference a student profile"));
    }

    let enrollment = course_service::enroll(&state.pool, id, body.student_id).await?;
    state
        .audit(&user, "enrollment.create", "course", Some(id), json!({ "student_id": body.student_id }))
        .await;
    Ok(ApiResponse::created(enrollment))
}

/// DELETE /api/courses/:id/enrollments/:student_id
pub async fn enrollment_delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((id, student_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    user.require_staff()?;
    state.rate_limit("enrollments:write", &user)?;
    managed_course(&state.pool, &user, id).await?;

    course_service::unenroll(&state.pool, id, student_id).await?;
    state
        .audit(&user, "enrollment.delete", "course", Some(id), json!({ "student_id": student_id }))
        .await;
    Ok(ApiResponse::no_content())
}

/// GET /api/courses/:id/progress - per-student progress summaries
pub async fn course_progress(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<ProgressSummary>> {
    user.require_staff()?;
    state.rate_limit("courses:read", &user)?;
    managed_course(&state.pool, &user, id).await?;
    Ok(ApiResponse::success(course_service::progress(&state.pool, id).await?))
}

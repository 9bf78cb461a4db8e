use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::database::models::Announcement;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::access::{managed_course, visible_course};
use crate::services::notification_service::{self, NotificationKind};
use crate::services::{announcement_service, course_service};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncement {
    pub title: String,
    pub body: String,
    pub publish_at: Option<DateTime<Utc>>,
}

/// GET /api/courses/:course_id/announcements - newest first; scheduled ones
/// only for the course teacher and admins
pub async fn announcement_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Announcement>> {
    state.rate_limit("announcements:read", &user)?;
    let (_, role) = visible_course(&state.pool, &user, course_id).await?;
    let announcements =
        announcement_service::list(&state.pool, course_id, role.can_manage(), state.page(&query)).await?;
    Ok(ApiResponse::success(announcements))
}

/// POST /api/courses/:course_id/announcements
pub async fn announcement_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateAnnouncement>,
) -> ApiResult<Announcement> {
    user.require_staff()?;
    state.rate_limit("announcements:write", &user)?;
    Validator::new()
        .text("title", &body.title, 1, 200)
        .text("body", &body.body, 1, 10_000)
        .finish()?;

    let course = managed_course(&state.pool, &user, course_id).await?;
    let announcement =
        announcement_service::create(&state.pool, course_id, user.id, &body.title, &body.body, body.publish_at).await?;

    if announcement.publish_at <= Utc::now() {
        notify_students(&state, &course.title, &announcement).await;
    }

    Ok(ApiResponse::created(announcement))
}

async fn notify_students(state: &AppState, course_title: &str, announcement: &Announcement) {
    let result: Result<u64, DatabaseError> = async {
        let students = course_service::enrolled_student_ids(&state.pool, announcement.course_id).await?;
        notification_service::notify_many(
            &state.pool,
            &students,
            NotificationKind::Announcement,
            &format!("{}: {}", course_title, announcement.title),
            None,
            json!({ "announcement_id": announcement.id, "course_id": announcement.course_id }),
        )
        .await
    }
    .await;

    match result {
        Ok(sent) => tracing::debug!("Announcement {} notified {} students", announcement.id, sent),
        Err(e) => tracing::error!("Failed to notify students of announcement {}: {}", announcement.id, e),
    }
}

/// DELETE /api/announcements/:id - author or admin
pub async fn announcement_delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    user.require_staff()?;
    state.rate_limit("announcements:write", &user)?;

    let announcement = announcement_service::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    visible_course(&state.pool, &user, announcement.course_id).await?;
    if announcement.author_id != user.id && !user.is_admin() {
        return Err(ApiError::forbidden("Only the author or an admin can delete this announcement"));
    }

    announcement_service::delete(&state.pool, id).await?;
    state
        .audit(
            &user,
            "announcement.delete",
            "announcement",
            Some(id),
            json!({ "course_id": announcement.course_id, "title": announcement.title }),
        )
        .await;
    Ok(ApiResponse::no_content())
}

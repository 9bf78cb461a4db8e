use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::PageQuery;
use crate::database::models::Notification;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::notification_service;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

/// GET /api/notifications?unread=true
pub async fn notification_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<NotificationQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Notification>> {
    state.rate_limit("notifications:read", &user)?;
    let items = notification_service::list(&state.pool, user.id, query.unread, state.page(&page)).await?;
    Ok(ApiResponse::success(items))
}

/// POST /api/notifications/:id/read
pub async fn notification_read(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Notification> {
    state.rate_limit("notifications:write", &user)?;
    Ok(ApiResponse::success(notification_service::mark_read(&state.pool, id, user.id).await?))
}

/// POST /api/notifications/read-all
pub async fn notification_read_all(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    state.rate_limit("notifications:write", &user)?;
    let updated = notification_service::mark_all_read(&state.pool, user.id).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })))
}

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::PageQuery;
use crate::database::models::AuditLog;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::audit_service;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
}

/// GET /api/admin/audit-logs?actor_id=&entity_type=
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<AuditFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<AuditLog>> {
    user.require_admin()?;
    state.rate_limit("admin:read", &user)?;
    let logs = audit_service::list(&state.pool, filter.actor_id, filter.entity_type.as_deref(), state.page(&page)).await?;
    Ok(ApiResponse::success(logs))
}

use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::database::models::DlqMessage;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::dlq_service;
use crate::state::AppState;

const STATUSES: &[&str] = &["pending", "replayed", "discarded"];

#[derive(Debug, Default, Deserialize)]
pub struct DlqFilter {
    pub status: Option<String>,
}

/// GET /api/admin/dlq?status=
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<DlqFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<DlqMessage>> {
    user.require_admin()?;
    state.rate_limit("admin:read", &user)?;
    if let Some(status) = filter.status.as_deref() {
        Validator::new().one_of("status", status, STATUSES).finish()?;
    }
    let messages = dlq_service::list(&state.pool, filter.status.as_deref(), state.page(&page)).await?;
    Ok(ApiResponse::success(messages))
}

/// POST /api/admin/dlq/:id/replay
///
/// Marks the message replayed. Messages parked by a background job
/// (`job:<name>` topics) also trigger one run of that job in the background.
pub async fn replay(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<DlqMessage> {
    user.require_admin()?;
    state.rate_limit("admin:write", &user)?;

    let message = dlq_service::mark_replayed(&state.pool, id).await?;

    if let Some(job) = dlq_service::job_from_topic(&message.topic) {
        let jobs = state.jobs.clone();
        let job = job.to_string();
        tokio::spawn(async move {
            match jobs.run_once(&job).await {
                Ok(report) => tracing::info!(job = %job, affected = report.affected, "Replayed job finished"),
                Err(e) => tracing::warn!(job = %job, "Replayed job did not complete: {}", e),
            }
        });
    }

    state
        .audit(&user, "dlq.replay", "dlq_message", Some(id), json!({ "topic": message.topic, "attempts": message.attempts }))
        .await;
    Ok(ApiResponse::success(message))
}

/// DELETE /api/admin/dlq/:id - marks the message discarded
pub async fn discard(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<DlqMessage> {
    user.require_admin()?;
    state.rate_limit("admin:write", &user)?;
    let message = dlq_service::discard(&state.pool, id).await?;
    state
        .audit(&user, "dlq.discard", "dlq_message", Some(id), json!({ "topic": message.topic }))
        .await;
    Ok(ApiResponse::success(message))
}

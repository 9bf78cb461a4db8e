use axum::extract::State;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::database::models::UsageCounter;
use crate::error::ApiError;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::usage_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub metric: Option<String>,
}

/// GET /api/admin/usage?from=YYYY-MM-DD&to=YYYY-MM-DD&metric=
pub async fn report(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<UsageQuery>,
) -> ApiResult<Vec<UsageCounter>> {
    user.require_admin()?;
    state.rate_limit("admin:read", &user)?;

    usage_service::check_range(query.from, query.to).map_err(|problem| ApiError::invalid_field("to", problem))?;
    let counters = usage_service::report(&state.pool, query.from, query.to, query.metric.as_deref()).await?;
    Ok(ApiResponse::success(counters))
}

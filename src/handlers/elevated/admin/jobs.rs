use axum::extract::State;
use serde_json::json;

use crate::jobs::{JobInfo, JobReport};
use crate::middleware::{ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/admin/jobs
pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<JobInfo>> {
    user.require_admin()?;
    state.rate_limit("admin:read", &user)?;
    Ok(ApiResponse::success(state.jobs.list()))
}

/// POST /api/admin/jobs/:name/run - run once now and wait for the report
pub async fn run(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(name): ApiPath<String>,
) -> ApiResult<JobReport> {
    user.require_admin()?;
    state.rate_limit("admin:write", &user)?;

    let report = state.jobs.run_once(&name).await?;
    state
        .audit(&user, "job.run", "job", None, json!({ "job": name, "affected": report.affected }))
        .await;
    Ok(ApiResponse::success(report))
}

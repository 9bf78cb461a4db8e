use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::services::usage_service;
use crate::state::AppState;

/// Counts requests per day as `"<METHOD> <route pattern>"`.
///
/// The counter write is spawned so it never delays or fails the request.
pub async fn usage_tracking_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.api.enable_usage_tracking {
        return next.run(request).await;
    }

    let metric = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| format!("{} {}", request.method(), path.as_str()));

    let response = next.run(request).await;

    if let Some(metric) = metric {
        let pool = state.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = usage_service::increment(&pool, Utc::now().date_naive(), &metric).await {
                tracing::debug!("Usage counter for '{}' not recorded: {}", metric, e);
            }
        });
    }

    response
}

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Hides the expertfolio routes entirely while the feature is off
pub async fn expertfolio_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.features.expertfolio {
        return ApiError::not_found("Not found").into_response();
    }
    next.run(request).await
}

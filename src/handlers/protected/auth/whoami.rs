use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::profile_service;
use crate::state::AppState;

/// GET /api/auth/whoami - the caller's profile, or their token claims when
/// no profile row exists yet
pub async fn whoami(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    state.rate_limit("auth:whoami", &user)?;

    let data = match profile_service::get(&state.pool, user.id).await? {
        Some(profile) => json!({
            "id": profile.id,
            "email": profile.email,
            "display_name": profile.display_name,
            "role": profile.role,
            "created_at": profile.created_at,
            "source": "profile",
        }),
        None => json!({
            "id": user.id,
            "email": user.email,
            "role": user.role,
            "source": "token",
        }),
    };

    Ok(ApiResponse::success(data))
}

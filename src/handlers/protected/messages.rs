use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::database::models::Message;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::rate_limit::RateBudget;
use crate::services::message_service::{self, Mailbox};
use crate::services::notification_service::{self, NotificationKind};
use crate::services::profile_service;
use crate::state::AppState;

/// Messages a single user may send per minute
const SEND_BUDGET: RateBudget = RateBudget::per_minute(30);

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MailboxQuery {
    #[serde(rename = "box")]
    pub mailbox: Option<String>,
}

/// POST /api/messages
pub async fn message_send(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<SendMessage>,
) -> ApiResult<Message> {
    state.rate_limit_with("messages:send", &user, SEND_BUDGET)?;

    Validator::new()
        .check("recipient_id", body.recipient_id != user.id, "cannot send a message to yourself")
        .text("subject", &body.subject, 1, 200)
        .text("body", &body.body, 1, 10_000)
        .finish()?;

    if profile_service::get(&state.pool, body.recipient_id).await?.is_none() {
        return Err(ApiError::invalid_field("recipient_id", "recipient does not exist"));
    }

    let message = message_service::send(&state.pool, user.id, body.recipient_id, &body.subject, &body.body).await?;

    if let Err(e) = notification_service::notify(
        &state.pool,
        message.recipient_id,
        NotificationKind::Message,
        &format!("New message: {}", message.subject),
        None,
        json!({ "message_id": message.id, "sender_id": user.id }),
    )
    .await
    {
        tracing::error!("Failed to notify {} of message {}: {}", message.recipient_id, message.id, e);
    }

    Ok(ApiResponse::created(message))
}

/// GET /api/messages?box=inbox|sent
pub async fn message_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<MailboxQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Message>> {
    state.rate_limit("messages:read", &user)?;
    let mailbox = match query.mailbox.as_deref() {
        None => Mailbox::default(),
        Some(raw) => raw.parse::<Mailbox>().map_err(|e| ApiError::invalid_field("box", e))?,
    };
    let messages = message_service::list(&state.pool, user.id, mailbox, state.page(&page)).await?;
    Ok(ApiResponse::success(messages))
}

/// POST /api/messages/:id/read - recipient only
pub async fn message_read(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Message> {
    state.rate_limit("messages:write", &user)?;
    let message = message_service::get(&state.pool, id)
        .await?
        .filter(|m| m.recipient_id == user.id || m.sender_id == user.id)
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    if message.recipient_id != user.id {
        return Err(ApiError::forbidden("Only the recipient can mark a message read"));
    }
    Ok(ApiResponse::success(message_service::mark_read(&state.pool, id).await?))
}

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::Validator;
use crate::database::models::FileObject;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::access::{visible_course, CourseRole};
use crate::services::file_service::{self, CompleteOutcome, NewFile, UploadOutcome};
use crate::state::AppState;
use crate::storage::SignedUrl;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UploadTicket {
    pub file: FileObject,
    pub upload: SignedUrl,
}

#[derive(Debug, Serialize)]
pub struct DownloadTicket {
    pub file: FileObject,
    pub download: SignedUrl,
}

async fn load_file(state: &AppState, id: Uuid) -> Result<FileObject, ApiError> {
    file_service::get(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))
}

fn storage_failure(e: crate::storage::StorageError) -> ApiError {
    tracing::error!("Object storage error: {}", e);
    ApiError::bad_gateway("Object storage is unavailable")
}

/// POST /api/files/upload-url - reserve quota and issue a signed PUT URL
pub async fn upload_url(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<UploadRequest>,
) -> ApiResult<UploadTicket> {
    state.rate_limit("files:write", &user)?;

    let limits = &state.config.storage;
    let allowed: Vec<&str> = limits.allowed_content_types.iter().map(String::as_str).collect();
    Validator::new()
        .text("filename", &body.filename, 1, 255)
        .check(
            "filename",
            !body.filename.contains('/') && !body.filename.contains('\\'),
            "must not contain path separators",
        )
        .one_of("content_type", &body.content_type, &allowed)
        .range("size_bytes", body.size_bytes, 1, limits.max_upload_bytes)
        .finish()?;

    if let Some(course_id) = body.course_id {
        visible_course(&state.pool, &user, course_id).await?;
    }

    let new = NewFile {
        owner_id: user.id,
        course_id: body.course_id,
        filename: body.filename.trim(),
        content_type: &body.content_type,
        size_bytes: body.size_bytes,
    };
    let file = match file_service::create_pending(&state.pool, new, limits.default_quota_bytes).await? {
        UploadOutcome::Created(file) => file,
        UploadOutcome::QuotaExceeded(quota) => {
            tracing::info!(
                "Upload of {} bytes refused for {}: {}/{} used",
                body.size_bytes,
                user.id,
                quota.used_bytes,
                quota.quota_bytes
            );
            return Err(ApiError::payload_too_large(format!(
                "Storage quota exceeded: {} of {} bytes used",
                quota.used_bytes, quota.quota_bytes
            )));
        }
    };

    let upload = state
        .storage
        .signed_upload_url(&file.object_key, &file.content_type)
        .map_err(storage_failure)?;
    Ok(ApiResponse::created(UploadTicket { file, upload }))
}

/// POST /api/files/:id/complete
pub async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<FileObject> {
    state.rate_limit("files:write", &user)?;

    let file = load_file(&state, id).await?;
    if file.owner_id != user.id {
        return Err(ApiError::not_found("File not found"));
    }
    if file.status != "pending" {
        return Err(ApiError::conflict("File upload is already complete"));
    }

    let reported = match state.storage.object_size(&file.object_key).await {
        Ok(size) => size,
        Err(e) => {
            tracing::warn!("Could not read size of {} from storage: {}", file.object_key, e);
            None
        }
    };

    match file_service::complete(&state.pool, id, reported).await? {
        CompleteOutcome::Completed(file) => Ok(ApiResponse::success(file)),
        CompleteOutcome::Oversized { declared, actual } => Err(ApiError::payload_too_large(format!(
            "Uploaded object is {} bytes but only {} were declared",
            actual, declared
        ))),
    }
}

/// GET /api/files/:id/download-url
pub async fn download_url(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<DownloadTicket> {
    state.rate_limit("files:read", &user)?;

    let file = load_file(&state, id).await?;
    let allowed = if file.owner_id == user.id || user.is_admin() {
        true
    } else if let Some(course_id) = file.course_id {
        // Parents see the course but not its files
        match visible_course(&state.pool, &user, course_id).await {
            Ok((_, role)) => role != CourseRole::Parent,
            Err(_) => false,
        }
    } else {
        false
    };
    if !allowed {
        return Err(ApiError::not_found("File not found"));
    }
    if file.status != "uploaded" {
        return Err(ApiError::conflict("File upload has not completed"));
    }

    let download = state.storage.signed_download_url(&file.object_key).map_err(storage_failure)?;
    Ok(ApiResponse::success(DownloadTicket { file, download }))
}

/// DELETE /api/files/:id - owner or admin
pub async fn delete(State(state): State<AppState>, user: AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    state.rate_limit("files:write", &user)?;

    let file = load_file(&state, id).await?;
    if file.owner_id != user.id && !user.is_admin() {
        return Err(ApiError::not_found("File not found"));
    }
    file_service::delete(&state.pool, id).await?;
    state
        .audit(&user, "file.delete", "file", Some(id), json!({ "filename": file.filename }))
        .await;
    Ok(ApiResponse::no_content())
}

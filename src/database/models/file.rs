use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileObject {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub course_id: Option<Uuid>,
    pub object_key: String,
    pub filename: String,
    pub content_type: String,
    pub declared_bytes: i64,
    pub size_bytes: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageQuota {
    pub owner_id: Uuid,
    pub quota_bytes: i64,
    pub used_bytes: i64,
    pub reconciled_at: Option<DateTime<Utc>>,
}

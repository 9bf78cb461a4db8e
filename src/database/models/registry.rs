use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistryCourse {
    pub id: Uuid,
    pub external_id: String,
    pub provider: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistryVersion {
    pub id: Uuid,
    pub registry_course_id: Uuid,
    pub version: String,
    pub manifest: Value,
    pub status: String,
    pub created_by: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistryProvider {
    pub id: Uuid,
    pub name: String,
    pub health_url: String,
    pub created_at: DateTime<Utc>,
}

/// Provider joined with its most recent health check
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProviderHealth {
    pub provider_id: Uuid,
    pub name: String,
    pub health_url: String,
    pub status: Option<String>,
    pub latency_ms: Option<i64>,
    pub detail: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

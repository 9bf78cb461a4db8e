use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::{Page, PageQuery};
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::jobs::JobRegistry;
use crate::middleware::auth::AuthUser;
use crate::rate_limit::{RateBudget, RateLimiter};
use crate::services::audit_service;
use crate::storage::{self, ObjectStorage, StorageError};

/// Shared state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub limiter: Arc<RateLimiter>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jobs: Arc<JobRegistry>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppState {
    /// Wire up pool, storage, limiter and job registry from configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let pool = DatabaseManager::connect(&config.database).await?;
        let storage = storage::from_config(&config.storage, config.test_mode)?;
        Ok(Self::with_parts(config, pool, storage))
    }

    pub fn with_parts(config: AppConfig, pool: PgPool, storage: Arc<dyn ObjectStorage>) -> Self {
        let config = Arc::new(config);
        let jobs = Arc::new(JobRegistry::from_config(&config, pool.clone(), storage.clone()));
        Self {
            limiter: Arc::new(RateLimiter::new(config.api.enable_rate_limiting)),
            config,
            pool,
            storage,
            jobs,
        }
    }

    /// Default request budget from configuration
    pub fn default_budget(&self) -> RateBudget {
        RateBudget {
            requests: self.config.api.rate_limit_requests,
            window: Duration::from_secs(self.config.api.rate_limit_window_secs),
        }
    }

    pub fn rate_limit(&self, scope: &str, user: &AuthUser) -> Result<(), ApiError> {
        self.limiter.enforce(scope, user, self.default_budget())
    }

    /// Rate limit with a budget tighter than the default (never looser)
    pub fn rate_limit_with(&self, scope: &str, user: &AuthUser, budget: RateBudget) -> Result<(), ApiError> {
        let default = self.default_budget();
        let budget = RateBudget {
            requests: budget.requests.min(default.requests),
            window: budget.window,
        };
        self.limiter.enforce(scope, user, budget)
    }

    pub fn page(&self, query: &PageQuery) -> Page {
        Page::from_query(query, self.config.api.max_page_size)
    }

    /// Best-effort audit trail; failures are logged, never surfaced
    pub async fn audit(&self, actor: &AuthUser, action: &str, entity_type: &str, entity_id: Option<Uuid>, details: Value) {
        if !self.config.security.enable_audit_logging {
            return;
        }
        let entity_id = entity_id.map(|id| id.to_string());
        if let Err(e) =
            audit_service::record(&self.pool, Some(actor.id), action, entity_type, entity_id.as_deref(), details).await
        {
            tracing::error!("Failed to write audit log for {} {}: {}", action, entity_type, e);
        }
    }
}

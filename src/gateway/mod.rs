//! Client-side access to the platform's quiz, registry, submission and
//! grading operations.
//!
//! `HttpGateways` speaks to a running API; `InMemoryGateways` keeps the
//! same rules over local state and is used when `EDU_TEST_MODE` is set.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::{Grade, QuizAttempt, QuizDetail, RegistryCourse, RegistryVersion, Submission};

pub mod http;
pub mod memory;

pub use http::HttpGateways;
pub use memory::InMemoryGateways;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{code} ({status}): {message}")]
    Api { status: u16, code: String, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn api(status: u16, code: &str, message: impl Into<String>) -> Self {
        GatewayError::Api {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::api(404, "NOT_FOUND", what)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::api(409, "CONFLICT", message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::api(400, "VALIDATION_ERROR", message)
    }

    /// HTTP status behind an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait QuizGateway: Send + Sync {
    async fn get_quiz(&self, quiz_id: Uuid) -> Result<QuizDetail, GatewayError>;

    async fn start_attempt(&self, quiz_id: Uuid) -> Result<QuizAttempt, GatewayError>;

    async fn submit_attempt(&self, attempt_id: Uuid, answers: Vec<Option<i32>>) -> Result<QuizAttempt, GatewayError>;
}

#[async_trait]
pub trait RegistryGateway: Send + Sync {
    async fn list_courses(&self, status: Option<&str>) -> Result<Vec<RegistryCourse>, GatewayError>;

    async fn list_versions(&self, course_id: Uuid) -> Result<Vec<RegistryVersion>, GatewayError>;

    async fn publish_version(&self, course_id: Uuid, version: &str, manifest: Value) -> Result<RegistryVersion, GatewayError>;
}

#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, assignment_id: Uuid, body: Option<String>, file_id: Option<Uuid>) -> Result<Submission, GatewayError>;

    async fn list(&self, assignment_id: Uuid) -> Result<Vec<Submission>, GatewayError>;
}

#[async_trait]
pub trait GradingGateway: Send + Sync {
    async fn set_grade(&self, submission_id: Uuid, score: f64, feedback: Option<String>) -> Result<Grade, GatewayError>;

    async fn get_grade(&self, submission_id: Uuid) -> Result<Grade, GatewayError>;
}

/// One handle per gateway, all backed by the same implementation
#[derive(Clone)]
pub struct Gateways {
    pub quiz: Arc<dyn QuizGateway>,
    pub registry: Arc<dyn RegistryGateway>,
    pub submission: Arc<dyn SubmissionGateway>,
    pub grading: Arc<dyn GradingGateway>,
}

impl Gateways {
    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        if config.test_mode {
            tracing::info!("Using in-memory gateways with fixture data (test mode)");
            return Ok(Self::from_impl(Arc::new(InMemoryGateways::with_fixtures())));
        }
        let http = HttpGateways::new(&config.gateway.base_url, config.gateway.token.clone())?;
        Ok(Self::from_impl(Arc::new(http)))
    }

    pub fn from_impl<G>(gateway: Arc<G>) -> Self
    where
        G: QuizGateway + RegistryGateway + SubmissionGateway + GradingGateway + 'static,
    {
        Self {
            quiz: gateway.clone(),
            registry: gateway.clone(),
            submission: gateway.clone(),
            grading: gateway,
        }
    }
}

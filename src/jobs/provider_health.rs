use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::time::{Duration, Instant};

use super::{JobContext, JobError, JobOutcome, MaintenanceJob};
use crate::database::models::RegistryProvider;
use crate::services::registry_service;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const SLOW_THRESHOLD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "up",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        }
    }
}

/// Classify a probe by HTTP status (`None` for a transport error) and latency
pub fn classify(status: Option<u16>, latency: Duration) -> HealthStatus {
    match status {
        Some(200..=299) if latency < SLOW_THRESHOLD => HealthStatus::Up,
        Some(200..=299) | Some(429) | Some(503) => HealthStatus::Degraded,
        _ => HealthStatus::Down,
    }
}

struct Probe {
    status: HealthStatus,
    latency_ms: Option<i64>,
    detail: String,
}

pub struct ProviderHealthJob {
    client: Option<reqwest::Client>,
}

impl ProviderHealthJob {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| tracing::error!("Failed to build provider health client: {}", e))
            .ok();
        Self { client }
    }

    async fn probe(client: &reqwest::Client, provider: &RegistryProvider) -> Probe {
        let started = Instant::now();
        match client.get(&provider.health_url).send().await {
            Ok(response) => {
                let latency = started.elapsed();
                let code = response.status().as_u16();
                Probe {
                    status: classify(Some(code), latency),
                    latency_ms: Some(latency.as_millis() as i64),
                    detail: format!("HTTP {}", code),
                }
            }
            Err(e) => Probe {
                status: classify(None, started.elapsed()),
                latency_ms: None,
                detail: e.to_string(),
            },
        }
    }
}

impl Default for ProviderHealthJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MaintenanceJob for ProviderHealthJob {
    fn name(&self) -> &'static str {
        "provider-health"
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        };

        let providers = registry_service::providers(&ctx.pool).await?;
        let probes = join_all(providers.iter().map(|p| Self::probe(&client, p))).await;

        let mut counts = (0u64, 0u64, 0u64);
        for (provider, probe) in providers.iter().zip(&probes) {
            match probe.status {
                HealthStatus::Up => counts.0 += 1,
                HealthStatus::Degraded => counts.1 += 1,
                HealthStatus::Down => counts.2 += 1,
            }
            if probe.status != HealthStatus::Up {
                tracing::warn!("Provider {} is {}: {}", provider.name, probe.status.as_str(), probe.detail);
            }
            registry_service::record_health(
                &ctx.pool,
                provider.id,
                probe.status.as_str(),
                probe.latency_ms,
                Some(&probe.detail),
            )
            .await?;
        }

        Ok(JobOutcome::new(
            providers.len() as u64,
            json!({ "up": counts.0, "degraded": counts.1, "down": counts.2 }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn classification() {
        let fast = Duration::from_millis(120);
        let slow = Duration::from_millis(2500);
        assert_eq!(classify(Some(200), fast), HealthStatus::Up);
        assert_eq!(classify(Some(204), slow), HealthStatus::Degraded);
        assert_eq!(classify(Some(429), fast), HealthStatus::Degraded);
        assert_eq!(classify(Some(503), fast), HealthStatus::Degraded);
        assert_eq!(classify(Some(500), fast), HealthStatus::Down);
        assert_eq!(classify(Some(404), fast), HealthStatus::Down);
        assert_eq!(classify(None, fast), HealthStatus::Down);
    }

    fn provider(url: String) -> RegistryProvider {
        RegistryProvider {
            id: Uuid::new_v4(),
            name: "acme".into(),
            health_url: url,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn probes_report_status_and_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let ok = ProviderHealthJob::probe(&client, &provider(format!("{}/ok", server.uri()))).await;
        assert_eq!(ok.status, HealthStatus::Up);
        assert!(ok.latency_ms.is_some());

        let busy = ProviderHealthJob::probe(&client, &provider(format!("{}/busy", server.uri()))).await;
        assert_eq!(busy.status, HealthStatus::Degraded);
        assert_eq!(busy.detail, "HTTP 503");

        let down = ProviderHealthJob::probe(&client, &provider("http://127.0.0.1:1/health".into())).await;
        assert_eq!(down.status, HealthStatus::Down);
        assert!(down.latency_ms.is_none());
    }
}

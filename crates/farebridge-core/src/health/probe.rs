//! Provider liveness probes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use farebridge_types::models::{HealthStatus, Provider};
use farebridge_types::ProbeError;
use serde::Serialize;

use crate::error::AppResult;

/// Result of a probe that reached the provider and got a 2xx answer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProbeReport {
    pub provider_id: String,
    /// `Healthy`, or `Degraded` when the answer was slow
    pub status: HealthStatus,
    pub response_time_ms: i64,
    pub http_status: u16,
}

#[async_trait]
pub trait ProviderProbe: Send + Sync {
    async fn probe(&self, provider: &Provider) -> Result<ProbeReport, ProbeError>;
}

/// GET `base_url + health_path` with a bounded timeout.
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
    degraded_latency: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration, degraded_latency: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("farebridge-health/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout, degraded_latency })
    }

    fn timeout_error(&self, provider: &Provider) -> ProbeError {
        ProbeError::Timeout {
            provider_id: provider.id.clone(),
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[async_trait]
impl ProviderProbe for HttpProbe {
    async fn probe(&self, provider: &Provider) -> Result<ProbeReport, ProbeError> {
        let started = Instant::now();
        let request = self.client.get(provider.probe_url()).send();

        // Outer bound in case the client timeout does not cover a stalled body.
        let response = match tokio::time::timeout(self.timeout, request).await {
            Err(_) => return Err(self.timeout_error(provider)),
            Ok(Err(e)) if e.is_timeout() => return Err(self.timeout_error(provider)),
            Ok(Err(e)) => {
                return Err(ProbeError::Transport {
                    provider_id: provider.id.clone(),
                    message: e.to_string(),
                })
            },
            Ok(Ok(response)) => response,
        };

        let elapsed = started.elapsed();
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Http { provider_id: provider.id.clone(), status: status.as_u16() });
        }

        let health = if elapsed > self.degraded_latency {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Ok(ProbeReport {
            provider_id: provider.id.clone(),
            status: health,
            response_time_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            http_status: status.as_u16(),
        })
    }
}

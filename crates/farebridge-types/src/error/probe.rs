//! Health probe errors.
//!
//! Probe failures are absorbed by the health monitor and converted into
//! health samples and circuit-breaker outcomes. They never reach request
//! callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::HealthStatus;

/// Errors produced by a single provider probe.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ProbeError {
    /// Probe did not complete within its bounded timeout
    #[error("Probe of {provider_id} timed out after {timeout_ms}ms")]
    Timeout { provider_id: String, timeout_ms: u64 },

    /// Provider answered with a non-success HTTP status
    #[error("Probe of {provider_id} returned HTTP {status}")]
    Http { provider_id: String, status: u16 },

    /// Connection, DNS or TLS failure
    #[error("Probe of {provider_id} failed: {message}")]
    Transport { provider_id: String, message: String },
}

impl ProbeError {
    /// Health status recorded for this failure.
    ///
    /// Timeouts and client-side statuses (e.g. 429) mean the supplier is
    /// reachable but struggling; server errors and transport failures count
    /// as an outage.
    pub fn health_status(&self) -> HealthStatus {
        match self {
            Self::Timeout { .. } => HealthStatus::Degraded,
            Self::Http { status, .. } if *status >= 500 => HealthStatus::Outage,
            Self::Http { .. } => HealthStatus::Degraded,
            Self::Transport { .. } => HealthStatus::Outage,
        }
    }

    pub fn provider_id(&self) -> &str {
        match self {
            Self::Timeout { provider_id, .. }
            | Self::Http { provider_id, .. }
            | Self::Transport { provider_id, .. } => provider_id,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

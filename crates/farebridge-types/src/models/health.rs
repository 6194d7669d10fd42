//! Health sample and system snapshot models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Point-in-time probe result for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Probe succeeded within the latency budget
    Healthy,
    /// Reachable but slow, throttled, or timed out
    Degraded,
    /// Unreachable or answering with server errors
    Outage,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Outage => "outage",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Self::Healthy),
            "degraded" => Ok(Self::Degraded),
            "outage" => Ok(Self::Outage),
            other => Err(format!("unknown health status: {other}")),
        }
    }
}

/// Append-only probe record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSample {
    pub id: Uuid,
    pub provider_id: String,
    pub status: HealthStatus,
    pub response_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthSample {
    pub fn new(
        provider_id: impl Into<String>,
        status: HealthStatus,
        response_time_ms: Option<i64>,
        error_message: Option<String>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id: provider_id.into(),
            status,
            response_time_ms,
            error_message,
            checked_at,
        }
    }
}

/// Read-only projection of system health for dashboards and alerting.
/// Not authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemHealthSnapshot {
    pub id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub total_providers: usize,
    /// Enabled providers neither circuit-open nor over quota
    pub available_providers: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub outage: usize,
    /// Enabled providers with no health sample yet
    pub unprobed: usize,
    pub open_circuits: Vec<String>,
    pub half_open_circuits: Vec<String>,
    /// Providers at or above the critical quota band (not yet exceeded)
    pub critical_quota: Vec<String>,
    pub exceeded_quota: Vec<String>,
    /// Providers whose quota limit is an estimate
    pub estimated_quota: Vec<String>,
}

impl SystemHealthSnapshot {
    pub fn overall_healthy(&self) -> bool {
        self.available_providers > 0
    }
}

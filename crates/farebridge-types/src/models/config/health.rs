//! Health monitoring and retention configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for the periodic health prober
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Whether the scheduler runs probes at all
    pub enabled: bool,
    /// Interval between probe cycles in seconds (default: 3600 = hourly)
    pub probe_interval_seconds: u64,
    /// Per-probe timeout in milliseconds (default: 5000)
    pub probe_timeout_ms: u64,
    /// Successful probes slower than this are recorded as degraded (default: 2000)
    pub degraded_latency_ms: u64,
    /// Probes in flight at once (default: 4)
    pub max_concurrent_probes: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_interval_seconds: 3600,
            probe_timeout_ms: 5000,
            degraded_latency_ms: 2000,
            max_concurrent_probes: 4,
        }
    }
}

impl HealthConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_interval_seconds == 0 {
            return Err(ConfigError::invalid("health.probe_interval_seconds", "must be positive"));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::invalid("health.probe_timeout_ms", "must be positive"));
        }
        if self.max_concurrent_probes == 0 {
            return Err(ConfigError::invalid("health.max_concurrent_probes", "must be at least 1"));
        }
        Ok(())
    }
}

/// Retention windows for append-only data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetentionConfig {
    /// Health samples older than this are purged (default: 7)
    pub health_sample_days: i64,
    /// System health snapshots older than this are purged (default: 30)
    pub snapshot_days: i64,
    /// Rotation log entries older than this are purged (default: 90)
    pub rotation_log_days: i64,
    /// Interval between cleanup runs in seconds (default: 86400 = daily)
    pub cleanup_interval_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            health_sample_days: 7,
            snapshot_days: 30,
            rotation_log_days: 90,
            cleanup_interval_seconds: 86_400,
        }
    }
}

impl RetentionConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, days) in [
            ("retention.health_sample_days", self.health_sample_days),
            ("retention.snapshot_days", self.snapshot_days),
            ("retention.rotation_log_days", self.rotation_log_days),
        ] {
            if days <= 0 {
                return Err(ConfigError::invalid(field, "must be positive"));
            }
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "retention.cleanup_interval_seconds",
                "must be positive",
            ));
        }
        Ok(())
    }
}

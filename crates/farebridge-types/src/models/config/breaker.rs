//! Circuit breaker and state-write retry configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens (default: 3)
    pub failure_threshold: u32,
    /// Cool-down before a half-open trial is allowed (default: 30)
    pub open_duration_seconds: u64,
    /// Cool-down multiplier per repeated trip; 1.0 keeps a fixed timeout
    pub backoff_multiplier: f64,
    /// Upper bound for the backed-off cool-down (default: 600)
    pub max_open_duration_seconds: u64,
    /// How long a half-open trial may stay in flight before it is
    /// considered abandoned and another caller may take it (default: 60)
    pub trial_lease_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_duration_seconds: 30,
            backoff_multiplier: 1.0,
            max_open_duration_seconds: 600,
            trial_lease_seconds: 60,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn open_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.open_duration_seconds).unwrap_or(i64::MAX))
    }

    pub fn trial_lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.trial_lease_seconds).unwrap_or(i64::MAX))
    }

    /// Cool-down for the `trips`-th consecutive open (1-based), with backoff.
    pub fn open_duration_for_trip(&self, trips: u32) -> chrono::Duration {
        let exponent = i32::try_from(trips.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.open_duration_seconds as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_open_duration_seconds.max(self.open_duration_seconds) as f64);
        chrono::Duration::milliseconds((capped * 1000.0) as i64)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.failure_threshold",
                "must be at least 1",
            ));
        }
        if self.open_duration_seconds == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.open_duration_seconds",
                "must be positive",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.backoff_multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if self.trial_lease_seconds == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.trial_lease_seconds",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Retry policy for compare-and-swap conflicts on circuit and quota state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first (default: 5)
    pub max_attempts: u32,
    /// First backoff delay in milliseconds (default: 10)
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds (default: 200)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay_ms: 10, max_delay_ms: 200 }
    }
}

impl RetryConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

//! Quota tracking configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::QuotaThresholds;

/// Configuration for quota tracking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotaConfig {
    /// Status bands (default: 75 / 90 / 100)
    pub thresholds: QuotaThresholds,
    /// Rolling window length for providers without their own (default: 86400 = daily)
    pub default_window_seconds: i64,
    /// Limit assumed for providers that do not declare one (default: 10000)
    pub default_limit: i64,
    /// How often the scheduler looks for elapsed windows (default: 300)
    pub reset_check_interval_seconds: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            thresholds: QuotaThresholds::default(),
            default_window_seconds: 86_400,
            default_limit: 10_000,
            reset_check_interval_seconds: 300,
        }
    }
}

impl QuotaConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        if !(0.0 < t.warning_pct && t.warning_pct <= t.critical_pct && t.critical_pct <= t.exceeded_pct)
        {
            return Err(ConfigError::invalid(
                "quota.thresholds",
                "expected 0 < warning_pct <= critical_pct <= exceeded_pct",
            ));
        }
        if self.default_window_seconds <= 0 {
            return Err(ConfigError::invalid("quota.default_window_seconds", "must be positive"));
        }
        if self.default_limit < 0 {
            return Err(ConfigError::invalid("quota.default_limit", "must not be negative"));
        }
        if self.reset_check_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "quota.reset_check_interval_seconds",
                "must be positive",
            ));
        }
        Ok(())
    }
}

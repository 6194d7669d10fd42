//! Engine configuration models.
//!
//! Thresholds and timings are injected into the circuit breaker, quota
//! tracker and health monitor constructors instead of living in scattered
//! constants. Every field has a documented default.

mod breaker;
mod health;
mod quota;

pub use breaker::{CircuitBreakerConfig, RetryConfig};
pub use health::{HealthConfig, RetentionConfig};
pub use quota::QuotaConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::ProviderSeed;
use crate::error::ConfigError;

/// Full engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Provider catalogue registered at startup
    #[serde(default)]
    pub providers: Vec<ProviderSeed>,
}

impl OrchestratorConfig {
    /// Reject values that would make the engine misbehave silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.circuit_breaker.validate()?;
        self.quota.validate()?;
        self.health.validate()?;
        self.retention.validate()?;
        self.retry.validate()?;

        let mut seen = HashSet::new();
        for seed in &self.providers {
            seed.validate()?;
            if !seen.insert(seed.id.as_str()) {
                return Err(ConfigError::invalid(
                    "providers.id",
                    format!("duplicate provider id '{}'", seed.id),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::ServiceType;

    fn seed(id: &str) -> ProviderSeed {
        ProviderSeed {
            id: id.to_string(),
            service_type: ServiceType::Flight,
            enabled: true,
            priority: 1,
            base_url: "https://example.test".to_string(),
            health_path: None,
            quota_limit: Some(1000),
            is_actual_quota_limit: true,
            quota_window_seconds: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let config =
            OrchestratorConfig { providers: vec![seed("a"), seed("a")], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_zero_quota_window_rejected() {
        let mut bad = seed("a");
        bad.quota_window_seconds = Some(0);
        let config = OrchestratorConfig { providers: vec![bad], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "circuit_breaker": { "failure_threshold": 2 },
            "providers": [
                { "id": "duffel", "service_type": "flight", "base_url": "https://api.duffel.test" }
            ]
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.circuit_breaker.open_duration_seconds, 30);
        assert_eq!(config.quota.thresholds.critical_pct, 90.0);
        assert_eq!(config.providers[0].priority, 100);
        assert!(config.providers[0].enabled);
        assert!(!config.providers[0].is_actual_quota_limit);
        assert!(config.validate().is_ok());
    }
}

//! Provider selection errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ExclusionSummary, ServiceType};

/// Errors surfaced to the search fan-out by provider selection.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum RoutingError {
    /// Every registered provider for the service type was filtered out.
    /// This is a hard failure of the search and is never retried internally.
    #[error("No eligible {service_type} provider: {}", summary.describe())]
    NoEligibleProvider {
        /// Service type the search asked for
        service_type: ServiceType,
        /// Why each candidate was dropped
        summary: ExclusionSummary,
    },

    /// Provider id is not present in the registry
    #[error("Unknown provider: {id}")]
    UnknownProvider {
        /// Identifier that failed to resolve
        id: String,
    },

    /// Service type string could not be parsed
    #[error("Invalid service type: {value}")]
    InvalidServiceType {
        /// Raw value received from the caller
        value: String,
    },
}

/// Dominant reason a service type has no eligible provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionCause {
    /// Nothing registered for the service type
    EmptyRegistry,
    /// Providers exist but operators disabled all of them
    AllDisabled,
    /// Every enabled provider hit its vendor quota
    QuotaExhausted,
    /// Every enabled provider is isolated by its circuit breaker
    CircuitsOpen,
    /// The caller excluded the remaining providers itself
    CallerExcluded,
    /// A combination of quota, circuit and caller exclusions
    Mixed,
}

impl RoutingError {
    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoEligibleProvider { service_type, .. } => {
                format!("{} search is temporarily unavailable, please try again shortly", service_type.display_name())
            },
            Self::UnknownProvider { .. } | Self::InvalidServiceType { .. } => {
                "The search request could not be processed".to_string()
            },
        }
    }

    /// Detailed message for operators, separating quota exhaustion from
    /// supplier outages.
    pub fn operator_message(&self) -> String {
        match self {
            Self::NoEligibleProvider { service_type, summary } => {
                let headline = match summary.cause() {
                    ExhaustionCause::EmptyRegistry => "no providers are registered",
                    ExhaustionCause::AllDisabled => "all providers are disabled by configuration",
                    ExhaustionCause::QuotaExhausted => "all enabled providers have exhausted their quota",
                    ExhaustionCause::CircuitsOpen => {
                        "all enabled providers are isolated by open circuit breakers (supplier outage)"
                    },
                    ExhaustionCause::CallerExcluded => "the caller excluded every remaining provider",
                    ExhaustionCause::Mixed => "providers are unavailable for mixed reasons",
                };
                format!("{service_type}: {headline} ({})", summary.describe())
            },
            other => other.to_string(),
        }
    }

    /// Whether the error indicates exhausted capacity rather than bad input.
    pub fn is_capacity_exhaustion(&self) -> bool {
        matches!(self, Self::NoEligibleProvider { .. })
    }
}

impl ExclusionSummary {
    /// Classify the exclusions into a single dominant cause.
    pub fn cause(&self) -> ExhaustionCause {
        if self.registered == 0 {
            return ExhaustionCause::EmptyRegistry;
        }
        if self.disabled == self.registered {
            return ExhaustionCause::AllDisabled;
        }
        let circuit = self.circuit_open + self.trial_in_flight;
        match (self.quota_exceeded > 0, circuit > 0, self.caller_excluded > 0) {
            (true, false, false) => ExhaustionCause::QuotaExhausted,
            (false, true, false) => ExhaustionCause::CircuitsOpen,
            (false, false, true) => ExhaustionCause::CallerExcluded,
            _ => ExhaustionCause::Mixed,
        }
    }

    /// Human readable breakdown, e.g. `registered=3 disabled=1 circuit_open=2`.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("registered={}", self.registered)];
        for (label, count) in [
            ("disabled", self.disabled),
            ("circuit_open", self.circuit_open),
            ("trial_in_flight", self.trial_in_flight),
            ("quota_exceeded", self.quota_exceeded),
            ("caller_excluded", self.caller_excluded),
        ] {
            if count > 0 {
                parts.push(format!("{label}={count}"));
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(registered: usize) -> ExclusionSummary {
        ExclusionSummary { registered, ..Default::default() }
    }

    #[test]
    fn test_cause_empty_registry() {
        assert_eq!(summary(0).cause(), ExhaustionCause::EmptyRegistry);
    }

    #[test]
    fn test_cause_all_disabled() {
        let s = ExclusionSummary { disabled: 2, ..summary(2) };
        assert_eq!(s.cause(), ExhaustionCause::AllDisabled);
    }

    #[test]
    fn test_cause_quota_vs_circuit() {
        let quota = ExclusionSummary { quota_exceeded: 2, ..summary(2) };
        assert_eq!(quota.cause(), ExhaustionCause::QuotaExhausted);

        let circuit = ExclusionSummary { circuit_open: 1, trial_in_flight: 1, ..summary(2) };
        assert_eq!(circuit.cause(), ExhaustionCause::CircuitsOpen);

        let mixed = ExclusionSummary { circuit_open: 1, quota_exceeded: 1, ..summary(2) };
        assert_eq!(mixed.cause(), ExhaustionCause::Mixed);
    }

    #[test]
    fn test_operator_message_names_quota_exhaustion() {
        let err = RoutingError::NoEligibleProvider {
            service_type: ServiceType::Flight,
            summary: ExclusionSummary { quota_exceeded: 2, ..summary(2) },
        };
        let msg = err.operator_message();
        assert!(msg.contains("quota"));
        assert!(msg.contains("quota_exceeded=2"));
        assert!(!err.user_message().contains("quota"));
    }
}

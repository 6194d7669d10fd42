//! Provider selection request and result models.

use serde::{Deserialize, Serialize};

use super::{CircuitState, QuotaStatus, ServiceType};

/// Per-request selection inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectionContext {
    /// Logical search identifier, used for log correlation only
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Providers the caller already tried or does not want
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// One provider in the ordered candidate list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderCandidate {
    pub provider_id: String,
    pub priority: i32,
    pub circuit_state: CircuitState,
    pub quota_status: QuotaStatus,
    pub is_actual_quota_limit: bool,
    /// This selection holds the provider's half-open trial lease
    pub is_trial: bool,
}

/// Ordered providers to attempt for one logical search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Selection {
    pub service_type: ServiceType,
    pub candidates: Vec<ProviderCandidate>,
    /// Why the remaining registered providers were skipped
    pub excluded: ExclusionSummary,
}

impl Selection {
    pub fn provider_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.provider_id.clone()).collect()
    }

    pub fn first(&self) -> Option<&ProviderCandidate> {
        self.candidates.first()
    }
}

/// Counts of registered providers per exclusion reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionSummary {
    /// Providers registered for the service type, enabled or not
    pub registered: usize,
    pub disabled: usize,
    pub circuit_open: usize,
    /// Half-open providers whose single trial is already taken
    pub trial_in_flight: usize,
    pub quota_exceeded: usize,
    pub caller_excluded: usize,
}

//! Rotation log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CircuitState, QuotaStatus, ServiceType};

/// Outcome of one real provider call, reported by the search fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptOutcome {
    /// Ties together every attempt of one logical search
    pub correlation_id: String,
    pub provider_id: String,
    /// 1-based position of this attempt within the search
    pub attempt_order: i32,
    pub success: bool,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
    #[serde(default)]
    pub result_count: Option<i32>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Immutable audit record of one provider attempt.
///
/// Carries the provider's circuit and quota state right after the outcome
/// was applied, including whether the quota limit is only an estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotationLogEntry {
    pub id: Uuid,
    pub correlation_id: String,
    pub provider_id: String,
    pub service_type: ServiceType,
    pub attempt_order: i32,
    pub success: bool,
    pub response_time_ms: Option<i64>,
    pub result_count: Option<i32>,
    pub error_message: Option<String>,
    pub circuit_state_after: CircuitState,
    pub quota_status_after: QuotaStatus,
    pub is_actual_quota_limit: bool,
    pub created_at: DateTime<Utc>,
}

//! Administrative state reset.
//!
//! Reconciliation is idempotent: a second run with the same request and no
//! traffic in between reports no actions.

use chrono::{DateTime, Duration, Utc};
use farebridge_types::models::CircuitState;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::AppResult;
use crate::quota::QuotaTracker;
use crate::registry::ProviderRegistry;

const DEFAULT_STALE_AFTER_SECONDS: i64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// Providers to reconcile; empty means all registered providers
    #[serde(default)]
    pub provider_ids: Vec<String>,
    /// Close every non-closed circuit regardless of age
    #[serde(default)]
    pub force_close_circuits: bool,
    /// Zero usage counters whose limit is an estimate
    #[serde(default)]
    pub reset_estimated_quota: bool,
    /// A non-closed circuit untouched for this long is closed (default 3600)
    #[serde(default)]
    pub stale_after_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    CircuitClosed { provider_id: String, previous: CircuitState, forced: bool },
    TrialLeaseReleased { provider_id: String },
    QuotaWindowReset { provider_id: String },
    EstimatedQuotaReset { provider_id: String, previous_used: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub ran_at: DateTime<Utc>,
    pub providers_checked: usize,
    pub actions: Vec<ReconcileAction>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

pub(crate) async fn reconcile_at(
    registry: &ProviderRegistry,
    breaker: &CircuitBreaker,
    quotas: &QuotaTracker,
    request: &ReconcileRequest,
    now: DateTime<Utc>,
) -> AppResult<ReconcileReport> {
    let ids: Vec<String> = if request.provider_ids.is_empty() {
        registry.list().into_iter().map(|p| p.id).collect()
    } else {
        for id in &request.provider_ids {
            registry.get(id)?;
        }
        request.provider_ids.clone()
    };
    let stale_after =
        Duration::seconds(request.stale_after_seconds.unwrap_or(DEFAULT_STALE_AFTER_SECONDS).max(0));

    let mut actions = Vec::new();
    for id in &ids {
        let circuit = breaker.refresh(id).await?;
        let stale = circuit.state != CircuitState::Closed && now - circuit.updated_at >= stale_after;
        if (request.force_close_circuits || stale) && breaker.force_close_at(id, now).await? {
            actions.push(ReconcileAction::CircuitClosed {
                provider_id: id.clone(),
                previous: circuit.state,
                forced: request.force_close_circuits,
            });
        } else if breaker.release_abandoned_trial_at(id, now).await? {
            actions.push(ReconcileAction::TrialLeaseReleased { provider_id: id.clone() });
        }

        if quotas.reset_if_window_elapsed_at(id, now).await? {
            actions.push(ReconcileAction::QuotaWindowReset { provider_id: id.clone() });
        }

        if request.reset_estimated_quota {
            if let Some(record) = quotas.refresh(id).await? {
                if !record.is_actual_quota_limit && quotas.reset_usage_at(id, now).await? {
                    actions.push(ReconcileAction::EstimatedQuotaReset {
                        provider_id: id.clone(),
                        previous_used: record.quota_used,
                    });
                }
            }
        }
    }

    info!(
        providers = ids.len(),
        actions = actions.len(),
        "Provider state reconciled"
    );
    Ok(ReconcileReport { ran_at: now, providers_checked: ids.len(), actions })
}

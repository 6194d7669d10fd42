//! Per-provider circuit breaker.
//!
//! States:
//! - Closed: normal operation, the provider is selectable
//! - Open: isolated until `reopen_after`; never selected
//! - Half-Open: cool-down elapsed; exactly one trial request may claim it
//!
//! State lives in the [`ProviderStore`] and is written with compare-and-swap
//! on `version`. The in-memory cache mirrors the last row this process read
//! or wrote and serves the selector's hot path.

mod transition;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use farebridge_types::models::config::{CircuitBreakerConfig, RetryConfig};
use farebridge_types::models::{CircuitBreakerState, CircuitState};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::prometheus;
use crate::retry::retry_on_conflict;
use crate::store::{ProviderStore, StoreResult};

/// Summary of circuit breaker states across all providers
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CircuitBreakerSummary {
    pub closed: usize,
    pub open: usize,
    pub half_open: usize,
    /// Trips observed by this process since start
    pub total_trips: u64,
}

pub struct CircuitBreaker {
    store: Arc<dyn ProviderStore>,
    config: CircuitBreakerConfig,
    retry: RetryConfig,
    cache: DashMap<String, CircuitBreakerState>,
    total_trips: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(store: Arc<dyn ProviderStore>, config: CircuitBreakerConfig, retry: RetryConfig) -> Self {
        Self { store, config, retry, cache: DashMap::new(), total_trips: AtomicU64::new(0) }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Create the closed row for a provider unless one exists.
    pub async fn ensure(&self, provider_id: &str) -> StoreResult<CircuitBreakerState> {
        let stored =
            self.store.init_circuit(&CircuitBreakerState::closed(provider_id, Utc::now())).await?;
        self.cache.insert(provider_id.to_string(), stored.clone());
        Ok(stored)
    }

    /// Replace the cache with the store's rows.
    pub async fn load(&self) -> StoreResult<usize> {
        let rows = self.store.list_circuits().await?;
        self.cache.clear();
        for row in &rows {
            prometheus::update_circuit_gauge(&row.provider_id, row.state);
            self.cache.insert(row.provider_id.clone(), row.clone());
        }
        Ok(rows.len())
    }

    /// Current state, from cache when present.
    pub async fn state(&self, provider_id: &str) -> StoreResult<CircuitBreakerState> {
        if let Some(cached) = self.cache.get(provider_id) {
            return Ok(cached.clone());
        }
        match self.store.get_circuit(provider_id).await? {
            Some(row) => {
                self.cache.insert(provider_id.to_string(), row.clone());
                Ok(row)
            },
            None => self.ensure(provider_id).await,
        }
    }

    /// Re-read one row from the store, bypassing the cache.
    pub async fn refresh(&self, provider_id: &str) -> StoreResult<CircuitBreakerState> {
        match self.store.get_circuit(provider_id).await? {
            Some(row) => {
                self.cache.insert(provider_id.to_string(), row.clone());
                Ok(row)
            },
            None => self.ensure(provider_id).await,
        }
    }

    /// Closed, or half-open with no live trial.
    pub async fn is_eligible(&self, provider_id: &str) -> StoreResult<bool> {
        self.is_eligible_at(provider_id, Utc::now()).await
    }

    pub async fn is_eligible_at(&self, provider_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let state = self.promote_if_elapsed_at(provider_id, now).await?;
        Ok(state.is_eligible(now, self.config.trial_lease()))
    }

    pub async fn record_outcome(
        &self,
        provider_id: &str,
        success: bool,
    ) -> StoreResult<CircuitBreakerState> {
        self.record_outcome_at(provider_id, success, Utc::now()).await
    }

    pub async fn record_outcome_at(
        &self,
        provider_id: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<CircuitBreakerState> {
        let (state, _) = self
            .update_with(provider_id, |current| {
                transition::apply_outcome(current, success, &self.config, now)
            })
            .await?;
        Ok(state)
    }

    /// Lazily move an open circuit with an elapsed deadline to half-open.
    pub async fn promote_if_elapsed_at(
        &self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<CircuitBreakerState> {
        let cached = self.state(provider_id).await?;
        if !cached.cooldown_elapsed(now) {
            return Ok(cached);
        }
        let (state, _) = self.update_with(provider_id, |current| transition::promote(current, now)).await?;
        Ok(state)
    }

    /// Claim the half-open trial. `true` means this caller owns the lease.
    pub async fn try_claim_trial(&self, provider_id: &str) -> StoreResult<bool> {
        self.try_claim_trial_at(provider_id, Utc::now()).await
    }

    pub async fn try_claim_trial_at(&self, provider_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let (_, claimed) = self
            .update_with(provider_id, |current| transition::claim_trial(current, &self.config, now))
            .await?;
        if claimed {
            debug!(provider_id = %provider_id, "Half-open trial claimed");
        }
        Ok(claimed)
    }

    pub async fn release_abandoned_trial_at(
        &self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let (_, released) = self
            .update_with(provider_id, |current| {
                transition::release_abandoned_trial(current, &self.config, now)
            })
            .await?;
        if released {
            info!(provider_id = %provider_id, "Abandoned half-open trial lease released");
        }
        Ok(released)
    }

    /// Reset to closed. Returns whether anything changed.
    pub async fn force_close_at(&self, provider_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let (_, changed) =
            self.update_with(provider_id, |current| transition::force_close(current, now)).await?;
        if changed {
            info!(provider_id = %provider_id, "Circuit breaker reset manually");
        }
        Ok(changed)
    }

    pub fn total_trips(&self) -> u64 {
        self.total_trips.load(Ordering::Relaxed)
    }

    pub fn get_summary(&self) -> CircuitBreakerSummary {
        let mut summary = CircuitBreakerSummary { total_trips: self.total_trips(), ..Default::default() };
        for entry in &self.cache {
            match entry.value().state {
                CircuitState::Closed => summary.closed += 1,
                CircuitState::Open => summary.open += 1,
                CircuitState::HalfOpen => summary.half_open += 1,
            }
        }
        summary
    }

    /// Read the stored row, apply `step`, and compare-and-swap the result.
    /// Returns the resulting state and whether a write happened.
    async fn update_with<F>(&self, provider_id: &str, step: F) -> StoreResult<(CircuitBreakerState, bool)>
    where
        F: Fn(&CircuitBreakerState) -> Option<CircuitBreakerState> + Send + Sync,
    {
        let step = &step;
        let (previous, result, changed) = retry_on_conflict(&self.retry, "circuit_breaker_state", || async move {
            let current = match self.store.get_circuit(provider_id).await? {
                Some(row) => row,
                None => self.ensure(provider_id).await?,
            };
            match step(&current) {
                Some(next) => {
                    self.store.swap_circuit(&next, current.version).await?;
                    Ok((current, next, true))
                },
                None => Ok((current.clone(), current, false)),
            }
        })
        .await?;

        // Concurrent writers can finish out of commit order.
        self.cache
            .entry(provider_id.to_string())
            .and_modify(|cached| {
                if result.version >= cached.version {
                    *cached = result.clone();
                }
            })
            .or_insert_with(|| result.clone());
        if changed && previous.state != result.state {
            self.log_transition(&previous, &result);
        }
        Ok((result, changed))
    }

    fn log_transition(&self, previous: &CircuitBreakerState, next: &CircuitBreakerState) {
        prometheus::record_circuit_transition(&next.provider_id, previous.state, next.state);
        match next.state {
            CircuitState::Open => {
                self.total_trips.fetch_add(1, Ordering::Relaxed);
                warn!(
                    provider_id = %next.provider_id,
                    failures = next.failure_count,
                    trips = next.consecutive_trips,
                    reopen_after = ?next.reopen_after,
                    "Circuit breaker opening ({} -> open)",
                    previous.state
                );
            },
            CircuitState::HalfOpen => {
                info!(
                    provider_id = %next.provider_id,
                    "Circuit breaker half-open, cool-down elapsed"
                );
            },
            CircuitState::Closed => {
                info!(
                    provider_id = %next.provider_id,
                    "Circuit breaker closing ({} -> closed)",
                    previous.state
                );
            },
        }
    }
}

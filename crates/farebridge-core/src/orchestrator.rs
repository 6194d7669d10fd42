//! Facade used by the search fan-out and the operator surface.
//!
//! One [`Orchestrator`] owns the registry, circuit breaker, quota tracker,
//! selector, rotation logger and health monitor, all sharing a single
//! [`ProviderStore`]. Callers never touch the components directly on the
//! request path: they ask for candidates with [`Orchestrator::select_providers`]
//! and report each real attempt with [`Orchestrator::record_attempt_outcome`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use farebridge_types::models::{
    AttemptOutcome, CircuitBreakerState, HealthSample, OrchestratorConfig, Provider, ProviderSeed,
    ProviderUpdate, QuotaRecord, RotationLogEntry, Selection, SelectionContext, ServiceType,
    SystemHealthSnapshot,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerSummary};
use crate::error::{AppError, AppResult};
use crate::health::{HealthMonitor, HttpProbe, ProviderProbe};
use crate::prometheus;
use crate::quota::QuotaTracker;
use crate::reconcile::{reconcile_at, ReconcileReport, ReconcileRequest};
use crate::registry::ProviderRegistry;
use crate::rotation::RotationLogger;
use crate::selector::ProviderSelector;
use crate::store::{ProviderStore, StoreError};

/// Rows removed by one retention pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub health_samples: u64,
    pub snapshots: u64,
    pub rotation_entries: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.health_samples + self.snapshots + self.rotation_entries
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn ProviderStore>,
    registry: Arc<ProviderRegistry>,
    breaker: Arc<CircuitBreaker>,
    quotas: Arc<QuotaTracker>,
    selector: ProviderSelector,
    rotation: RotationLogger,
    health: Arc<HealthMonitor>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn ProviderStore>,
        probe: Arc<dyn ProviderProbe>,
    ) -> AppResult<Self> {
        config.validate()?;

        let registry = Arc::new(ProviderRegistry::new(Arc::clone(&store)));
        let breaker = Arc::new(CircuitBreaker::new(
            Arc::clone(&store),
            config.circuit_breaker.clone(),
            config.retry.clone(),
        ));
        let quotas = Arc::new(QuotaTracker::new(
            Arc::clone(&store),
            config.quota.clone(),
            config.retry.clone(),
        ));
        let selector =
            ProviderSelector::new(Arc::clone(&registry), Arc::clone(&breaker), Arc::clone(&quotas));
        let rotation = RotationLogger::new(Arc::clone(&store));
        let health = HealthMonitor::with_config(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&breaker),
            probe,
            config.health.clone(),
            config.quota.thresholds.clone(),
        );

        Ok(Self { config, store, registry, breaker, quotas, selector, rotation, health })
    }

    /// Build with the reqwest-backed prober.
    pub fn with_http_probe(config: OrchestratorConfig, store: Arc<dyn ProviderStore>) -> AppResult<Self> {
        let probe = HttpProbe::new(
            config.health.probe_timeout(),
            Duration::from_millis(config.health.degraded_latency_ms),
        )?;
        Self::new(config, store, Arc::new(probe))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ProviderStore> {
        &self.store
    }

    pub fn health_monitor(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Load persisted state into the caches, then register the configured
    /// provider seeds. Returns the number of known providers.
    pub async fn bootstrap(&self) -> AppResult<usize> {
        let existing = self.registry.load().await?;
        self.breaker.load().await?;
        self.quotas.load().await?;
        debug!("Loaded {} providers from store", existing);

        for seed in &self.config.providers {
            self.register_provider(seed).await?;
        }

        let total = self.registry.list().len();
        info!(
            providers = total,
            seeded = self.config.providers.len(),
            "Orchestrator bootstrapped"
        );
        Ok(total)
    }

    /// Upsert a provider and create its closed circuit and empty quota record
    /// when they do not exist yet. The seed is validated before any write.
    pub async fn register_provider(&self, seed: &ProviderSeed) -> AppResult<Provider> {
        seed.validate().map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let provider = self.registry.upsert(seed).await?;
        self.breaker.ensure(&provider.id).await?;
        self.quotas
            .ensure(
                &provider.id,
                provider.service_type,
                seed.quota_limit,
                seed.quota_window_seconds,
                seed.is_actual_quota_limit,
            )
            .await?;
        Ok(provider)
    }

    pub async fn update_provider(&self, id: &str, update: &ProviderUpdate) -> AppResult<Provider> {
        if update.is_empty() {
            return Err(AppError::InvalidInput("update has no fields".to_string()));
        }
        self.registry.update(id, update).await
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.registry.list()
    }

    pub fn provider(&self, id: &str) -> AppResult<Provider> {
        Ok(self.registry.get(id)?)
    }

    pub async fn select_providers(
        &self,
        service_type: ServiceType,
        ctx: &SelectionContext,
    ) -> AppResult<Selection> {
        self.selector.select(service_type, ctx).await
    }

    pub async fn select_providers_at(
        &self,
        service_type: ServiceType,
        ctx: &SelectionContext,
        now: DateTime<Utc>,
    ) -> AppResult<Selection> {
        self.selector.select_at(service_type, ctx, now).await
    }

    /// Apply one attempt to the breaker and quota counter, then append the
    /// rotation entry carrying the resulting state.
    ///
    /// The three writes are not one transaction. They commit in order
    /// breaker, quota, rotation log. If a later write fails the error is
    /// returned, the earlier writes stay committed and no rotation entry is
    /// written. Callers should not replay the outcome, because the breaker
    /// would count it twice.
    pub async fn record_attempt_outcome(&self, outcome: AttemptOutcome) -> AppResult<RotationLogEntry> {
        self.record_attempt_outcome_at(outcome, Utc::now()).await
    }

    pub async fn record_attempt_outcome_at(
        &self,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> AppResult<RotationLogEntry> {
        if outcome.correlation_id.trim().is_empty() {
            return Err(AppError::InvalidInput("correlation_id must not be empty".to_string()));
        }
        if outcome.attempt_order < 1 {
            return Err(AppError::InvalidInput(format!(
                "attempt_order must be >= 1, got {}",
                outcome.attempt_order
            )));
        }
        let provider = self.registry.get(&outcome.provider_id)?;

        let circuit = self.breaker.record_outcome_at(&provider.id, outcome.success, now).await?;
        let quota = match self.quotas.record_usage_at(&provider.id, 1, now).await? {
            Some(record) => record,
            None => {
                warn!(provider_id = %provider.id, "Quota record missing, creating default");
                self.quotas.ensure(&provider.id, provider.service_type, None, None, false).await?;
                self.quotas
                    .record_usage_at(&provider.id, 1, now)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("quota record '{}'", provider.id)))?
            },
        };

        let entry = RotationLogEntry {
            id: Uuid::new_v4(),
            correlation_id: outcome.correlation_id,
            provider_id: provider.id.clone(),
            service_type: provider.service_type,
            attempt_order: outcome.attempt_order,
            success: outcome.success,
            response_time_ms: outcome.response_time_ms,
            result_count: outcome.result_count,
            error_message: outcome.error_message,
            circuit_state_after: circuit.state,
            quota_status_after: self.quotas.status_of(&quota),
            is_actual_quota_limit: quota.is_actual_quota_limit,
            created_at: now,
        };
        self.rotation.append(&entry).await?;
        prometheus::record_attempt(
            &provider.id,
            provider.service_type,
            entry.success,
            entry.response_time_ms,
        );
        Ok(entry)
    }

    /// Live projection over current state; persisted snapshots are history.
    pub async fn get_system_health(&self) -> AppResult<SystemHealthSnapshot> {
        self.health.live_snapshot().await
    }

    pub async fn run_health_cycle(&self) -> AppResult<SystemHealthSnapshot> {
        self.health.trigger().await
    }

    pub async fn reconcile_provider_state(&self, request: &ReconcileRequest) -> AppResult<ReconcileReport> {
        self.reconcile_provider_state_at(request, Utc::now()).await
    }

    pub async fn reconcile_provider_state_at(
        &self,
        request: &ReconcileRequest,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileReport> {
        reconcile_at(&self.registry, &self.breaker, &self.quotas, request, now).await
    }

    /// Reset every quota window that has elapsed. Returns the provider ids reset.
    pub async fn run_quota_resets(&self) -> AppResult<Vec<String>> {
        Ok(self.quotas.reset_all_elapsed().await?)
    }

    pub async fn cleanup_stale_data(&self) -> AppResult<CleanupReport> {
        self.cleanup_stale_data_at(Utc::now()).await
    }

    /// Drop samples, snapshots and rotation entries past their retention.
    pub async fn cleanup_stale_data_at(&self, now: DateTime<Utc>) -> AppResult<CleanupReport> {
        let retention = &self.config.retention;
        let report = CleanupReport {
            health_samples: self
                .store
                .purge_health_samples(now - ChronoDuration::days(retention.health_sample_days))
                .await?,
            snapshots: self
                .store
                .purge_snapshots(now - ChronoDuration::days(retention.snapshot_days))
                .await?,
            rotation_entries: self
                .store
                .purge_rotation_log(now - ChronoDuration::days(retention.rotation_log_days))
                .await?,
        };
        if report.total() > 0 {
            info!(
                samples = report.health_samples,
                snapshots = report.snapshots,
                rotation = report.rotation_entries,
                "Stale data cleaned up"
            );
        }
        Ok(report)
    }

    pub async fn rotation_for(&self, correlation_id: &str) -> AppResult<Vec<RotationLogEntry>> {
        Ok(self.rotation.entries_for(correlation_id).await?)
    }

    pub async fn recent_rotation_for_provider(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<RotationLogEntry>> {
        self.registry.get(provider_id)?;
        Ok(self.rotation.recent_for_provider(provider_id, since).await?)
    }

    /// Probe samples of one provider since `since`, oldest first.
    pub async fn health_history(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<HealthSample>> {
        self.registry.get(provider_id)?;
        Ok(self.store.health_samples_since(provider_id, since).await?)
    }

    /// Circuit rows as persisted, ordered by provider id.
    pub async fn circuits(&self) -> AppResult<Vec<CircuitBreakerState>> {
        Ok(self.store.list_circuits().await?)
    }

    pub fn circuit_summary(&self) -> CircuitBreakerSummary {
        self.breaker.get_summary()
    }

    /// Quota rows as persisted, ordered by provider id.
    pub async fn quotas(&self) -> AppResult<Vec<QuotaRecord>> {
        Ok(self.store.list_quotas().await?)
    }

    pub fn quota_tracker(&self) -> &QuotaTracker {
        &self.quotas
    }

    pub async fn set_quota_limit(&self, provider_id: &str, limit: i64, is_actual: bool) -> AppResult<QuotaRecord> {
        if limit < 0 {
            return Err(AppError::InvalidInput(format!("quota limit must be >= 0, got {limit}")));
        }
        self.registry.get(provider_id)?;
        self.quotas
            .set_limit(provider_id, limit, is_actual)
            .await?
            .ok_or_else(|| AppError::Store(StoreError::NotFound(format!("quota record '{provider_id}'"))))
    }
}

//! Periodic provider prober.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  HealthMonitor                                               │
//! │  ├── probe: Arc<dyn ProviderProbe>  (HttpProbe in prod)      │
//! │  ├── breaker: every probe result is a breaker outcome        │
//! │  ├── store: health samples + snapshot history                │
//! │  └── probe task: interval loop, watch-channel shutdown       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use farebridge_types::models::config::HealthConfig;
use farebridge_types::models::{
    HealthSample, HealthStatus, Provider, QuotaThresholds, SystemHealthSnapshot,
};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::probe::ProviderProbe;
use super::snapshot::build_snapshot;
use crate::circuit_breaker::CircuitBreaker;
use crate::error::AppResult;
use crate::prometheus;
use crate::registry::ProviderRegistry;
use crate::store::ProviderStore;

pub struct HealthMonitor {
    store: Arc<dyn ProviderStore>,
    registry: Arc<ProviderRegistry>,
    breaker: Arc<CircuitBreaker>,
    probe: Arc<dyn ProviderProbe>,
    config: HealthConfig,
    thresholds: QuotaThresholds,
    last_snapshot: RwLock<Option<SystemHealthSnapshot>>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl HealthMonitor {
    pub fn with_config(
        store: Arc<dyn ProviderStore>,
        registry: Arc<ProviderRegistry>,
        breaker: Arc<CircuitBreaker>,
        probe: Arc<dyn ProviderProbe>,
        config: HealthConfig,
        thresholds: QuotaThresholds,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);
        Arc::new(Self {
            store,
            registry,
            breaker,
            probe,
            config,
            thresholds,
            last_snapshot: RwLock::new(None),
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Snapshot persisted by the most recent cycle of this process.
    pub fn last_snapshot(&self) -> Option<SystemHealthSnapshot> {
        self.last_snapshot.read().clone()
    }

    /// Spawn the periodic probe loop. The first cycle runs after one interval.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = self.config.probe_interval();

        tokio::spawn(async move {
            info!("Health monitor started (interval {}s)", interval.as_secs());
            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        if let Err(e) = monitor.run_cycle().await {
                            warn!("Health probe cycle failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Health monitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Ad hoc cycle outside the schedule.
    pub async fn trigger(&self) -> AppResult<SystemHealthSnapshot> {
        info!("Ad hoc health cycle requested");
        self.run_cycle().await
    }

    /// Probe every enabled provider, feed the circuit breaker, then persist
    /// a snapshot. Individual probe failures are absorbed.
    pub async fn run_cycle(&self) -> AppResult<SystemHealthSnapshot> {
        let providers = self.registry.enabled();
        debug!("Health cycle: probing {} providers", providers.len());

        let samples: Vec<HealthSample> = stream::iter(providers)
            .map(|provider| async move { self.probe_one(&provider).await })
            .buffer_unordered(self.config.max_concurrent_probes.max(1))
            .collect()
            .await;

        let outages = samples.iter().filter(|s| s.status == HealthStatus::Outage).count();
        let snapshot = self.live_snapshot().await?;
        self.store.save_snapshot(&snapshot).await?;
        *self.last_snapshot.write() = Some(snapshot.clone());

        info!(
            probed = samples.len(),
            outages,
            available = snapshot.available_providers,
            "Health cycle complete"
        );
        Ok(snapshot)
    }

    /// Probe one provider and record the sample and breaker outcome.
    pub async fn probe_one(&self, provider: &Provider) -> HealthSample {
        let now = Utc::now();
        let sample = match self.probe.probe(provider).await {
            Ok(report) => {
                if let Err(e) = self.breaker.record_outcome(&provider.id, true).await {
                    warn!(provider_id = %provider.id, "Failed to record probe success: {}", e);
                }
                HealthSample::new(&provider.id, report.status, Some(report.response_time_ms), None, now)
            },
            Err(err) => {
                debug!(provider_id = %provider.id, "Probe failed: {}", err);
                if let Err(e) = self.breaker.record_outcome(&provider.id, false).await {
                    warn!(provider_id = %provider.id, "Failed to record probe failure: {}", e);
                }
                HealthSample::new(&provider.id, err.health_status(), None, Some(err.to_string()), now)
            },
        };

        prometheus::record_probe(&provider.id, sample.status, sample.response_time_ms);
        if let Err(e) = self.store.append_health_sample(&sample).await {
            warn!(provider_id = %provider.id, "Failed to store health sample: {}", e);
        }
        sample
    }

    /// Projection over current registry, breaker, quota and latest samples.
    pub async fn live_snapshot(&self) -> AppResult<SystemHealthSnapshot> {
        let providers = self.registry.list();
        let circuits = self.store.list_circuits().await?;
        let quotas = self.store.list_quotas().await?;
        let samples = self.store.latest_health_samples().await?;

        let snapshot =
            build_snapshot(&providers, &circuits, &quotas, &samples, &self.thresholds, Utc::now());
        prometheus::update_provider_gauges(snapshot.total_providers, snapshot.available_providers);
        Ok(snapshot)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

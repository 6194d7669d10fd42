//! Background Schedulers
//!
//! ## Health Probe
//! Owned by the core health monitor; started here with the configured
//! interval (default hourly) when `health.enabled` is set.
//!
//! ## Quota Window Reset
//! Checks every `quota.reset_check_interval_seconds` (default 300) and zeroes
//! each counter whose window has elapsed. Selection also resets lazily, so a
//! missed tick never keeps a provider excluded.
//!
//! ## Stale Data Cleanup
//! Purges health samples, snapshots and rotation entries past retention
//! once per `retention.cleanup_interval_seconds` (default daily).

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Start every background task. Handles are returned so callers may abort
/// them on shutdown.
pub fn start_all(state: &AppState) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    let orchestrator = state.orchestrator();
    if orchestrator.config().health.enabled {
        handles.push(orchestrator.health_monitor().start());
    } else {
        info!("[Scheduler] Health probing disabled by configuration");
    }
    handles.push(start_quota_reset(state.clone()));
    handles.push(start_cleanup(state.clone()));
    handles
}

pub fn start_quota_reset(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.orchestrator().config().quota.reset_check_interval_seconds.max(1));
    tokio::spawn(async move {
        info!("[QuotaReset] Scheduler started (every {}s)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.orchestrator().run_quota_resets().await {
                Ok(reset) if reset.is_empty() => debug!("[QuotaReset] No windows elapsed"),
                Ok(reset) => info!("[QuotaReset] Reset {} quota windows: {:?}", reset.len(), reset),
                Err(e) => warn!("[QuotaReset] Sweep failed: {}", e),
            }
        }
    })
}

pub fn start_cleanup(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.orchestrator().config().retention.cleanup_interval_seconds.max(60));
    tokio::spawn(async move {
        info!("[Cleanup] Scheduler started (every {}s)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = state.orchestrator().cleanup_stale_data().await {
                warn!("[Cleanup] Retention pass failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_app_state;
    use farebridge_core::ProviderStore;
    use farebridge_types::models::AttemptOutcome;

    #[tokio::test(start_paused = true)]
    async fn test_quota_reset_tick_sweeps_elapsed_windows() {
        let state = test_app_state().await;
        let orchestrator = state.orchestrator();
        orchestrator
            .record_attempt_outcome(AttemptOutcome {
                correlation_id: "s".to_string(),
                provider_id: "amadeus".to_string(),
                attempt_order: 1,
                success: true,
                response_time_ms: None,
                result_count: None,
                error_message: None,
            })
            .await
            .unwrap();

        // Exhaust expedia and move its window end into the past.
        let store = orchestrator.store();
        let current = store.get_quota("expedia").await.unwrap().unwrap();
        let mut expired = current.clone();
        expired.quota_used = 1;
        expired.reset_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        expired.version = current.version + 1;
        store.swap_quota(&expired, current.version).await.unwrap();

        let handle = start_quota_reset(state.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();

        let quotas = orchestrator.quotas().await.unwrap();
        let expedia = quotas.iter().find(|q| q.provider_id == "expedia").unwrap();
        assert_eq!(expedia.quota_used, 0);
        assert!(expedia.reset_at > chrono::Utc::now());
        // Day-long window still running.
        let amadeus = quotas.iter().find(|q| q.provider_id == "amadeus").unwrap();
        assert_eq!(amadeus.quota_used, 1);
    }
}

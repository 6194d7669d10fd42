//! Backoff for compare-and-swap conflicts on circuit and quota state.
//!
//! Only [`StoreError::Conflict`] is retried. Every other store error is
//! returned on the first occurrence.

use std::future::Future;
use std::time::Duration;

use farebridge_types::models::config::RetryConfig;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::store::{StoreError, StoreResult};

/// Delay before retry number `attempt` (0-based): exponential, capped, with
/// up to 50% random jitter so contending writers spread out.
pub fn conflict_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config
        .base_delay_ms
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(config.max_delay_ms.max(config.base_delay_ms));
    let jitter = if base > 1 { rand::thread_rng().gen_range(0..=base / 2) } else { 0 };
    Duration::from_millis(base.saturating_add(jitter))
}

/// Run `op` until it succeeds, fails with a non-conflict error, or
/// `config.max_attempts` conflicts have been seen.
///
/// `op` must re-read the current state on each call; retrying a write built
/// from a stale read would conflict forever.
pub async fn retry_on_conflict<T, F, Fut>(config: &RetryConfig, label: &str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Err(err @ StoreError::Conflict { .. }) => {
                attempt += 1;
                crate::prometheus::record_state_conflict(label);
                if attempt >= config.max_attempts {
                    warn!("[{}] Giving up after {} conflicting writes: {}", label, attempt, err);
                    return Err(err);
                }
                let delay = conflict_backoff(config, attempt - 1);
                debug!(
                    "[{}] Write conflict, retry {}/{} in {}ms",
                    label,
                    attempt,
                    config.max_attempts,
                    delay.as_millis()
                );
                sleep(delay).await;
            },
            other => return other,
        }
    }
}

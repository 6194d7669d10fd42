//! Rolling-window quota counters.
//!
//! Usage is tracked per provider against the vendor limit (or an estimate
//! when `is_actual_quota_limit` is false). Status bands come from
//! [`QuotaThresholds`]; `Exceeded` removes the provider from selection.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use farebridge_types::models::config::{QuotaConfig, RetryConfig};
use farebridge_types::models::{QuotaRecord, QuotaStatus, QuotaThresholds, ServiceType};
use tracing::{debug, info, warn};

use crate::prometheus;
use crate::retry::retry_on_conflict;
use crate::store::{ProviderStore, StoreResult};

/// `quota_used` never grows past this multiple of the limit.
pub const MAX_OVERSHOOT_FACTOR: i64 = 2;

fn usage_ceiling(limit: i64) -> i64 {
    limit.max(0).saturating_mul(MAX_OVERSHOOT_FACTOR)
}

/// Next `reset_at` strictly after `now`, advanced by whole windows.
fn next_reset_at(reset_at: DateTime<Utc>, window_seconds: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let window = window_seconds.max(1);
    if reset_at > now {
        return reset_at;
    }
    let behind = (now - reset_at).num_seconds();
    let windows = behind / window + 1;
    reset_at + Duration::seconds(windows.saturating_mul(window))
}

pub struct QuotaTracker {
    store: Arc<dyn ProviderStore>,
    config: QuotaConfig,
    retry: RetryConfig,
    cache: DashMap<String, QuotaRecord>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn ProviderStore>, config: QuotaConfig, retry: RetryConfig) -> Self {
        Self { store, config, retry, cache: DashMap::new() }
    }

    pub fn thresholds(&self) -> &QuotaThresholds {
        &self.config.thresholds
    }

    pub fn status_of(&self, record: &QuotaRecord) -> QuotaStatus {
        record.status(&self.config.thresholds)
    }

    /// Create the quota row for a provider unless one exists. Missing limit
    /// and window fall back to the configured defaults.
    pub async fn ensure(
        &self,
        provider_id: &str,
        service_type: ServiceType,
        limit: Option<i64>,
        window_seconds: Option<i64>,
        is_actual_quota_limit: bool,
    ) -> StoreResult<QuotaRecord> {
        let record = QuotaRecord::new(
            provider_id,
            service_type,
            limit.unwrap_or(self.config.default_limit),
            window_seconds.unwrap_or(self.config.default_window_seconds),
            is_actual_quota_limit && limit.is_some(),
            Utc::now(),
        );
        let stored = self.store.init_quota(&record).await?;
        self.cache.insert(provider_id.to_string(), stored.clone());
        Ok(stored)
    }

    pub async fn load(&self) -> StoreResult<usize> {
        let rows = self.store.list_quotas().await?;
        self.cache.clear();
        for row in &rows {
            prometheus::update_quota_gauge(&row.provider_id, row.percentage_used());
            self.cache.insert(row.provider_id.clone(), row.clone());
        }
        Ok(rows.len())
    }

    /// Current record, from cache when present. `None` if the provider has
    /// no quota row (treated as unlimited by callers).
    pub async fn record(&self, provider_id: &str) -> StoreResult<Option<QuotaRecord>> {
        if let Some(cached) = self.cache.get(provider_id) {
            return Ok(Some(cached.clone()));
        }
        let row = self.store.get_quota(provider_id).await?;
        if let Some(ref row) = row {
            self.cache.insert(provider_id.to_string(), row.clone());
        }
        Ok(row)
    }

    /// Re-read one row from the store, bypassing the cache.
    pub async fn refresh(&self, provider_id: &str) -> StoreResult<Option<QuotaRecord>> {
        let row = self.store.get_quota(provider_id).await?;
        match row {
            Some(ref row) => {
                self.cache.insert(provider_id.to_string(), row.clone());
            },
            None => {
                self.cache.remove(provider_id);
            },
        }
        Ok(row)
    }

    pub async fn record_usage(&self, provider_id: &str, delta: i64) -> StoreResult<Option<QuotaRecord>> {
        self.record_usage_at(provider_id, delta, Utc::now()).await
    }

    /// Add `delta` units of usage. An elapsed window is reset first so the
    /// usage lands in the current window.
    pub async fn record_usage_at(
        &self,
        provider_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<QuotaRecord>> {
        let before = self.record(provider_id).await?.map(|r| self.status_of(&r));
        let updated = self
            .update_with(provider_id, |current| {
                let mut next = current.clone();
                if next.window_elapsed(now) {
                    next.quota_used = 0;
                    next.reset_at = next_reset_at(next.reset_at, next.window_seconds, now);
                }
                next.quota_used = next
                    .quota_used
                    .saturating_add(delta)
                    .clamp(0, usage_ceiling(next.quota_limit));
                if next == *current {
                    return None;
                }
                next.version = current.version + 1;
                next.updated_at = now;
                Some(next)
            })
            .await?
            .map(|(record, _)| record);

        if let (Some(before), Some(record)) = (before, &updated) {
            let after = self.status_of(record);
            if after != before {
                self.log_status_change(record, before, after);
            }
        }
        Ok(updated)
    }

    pub async fn reset_if_window_elapsed(&self, provider_id: &str) -> StoreResult<bool> {
        self.reset_if_window_elapsed_at(provider_id, Utc::now()).await
    }

    /// Zero the counter when `now >= reset_at`. Returns whether a reset happened.
    pub async fn reset_if_window_elapsed_at(
        &self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let updated = self
            .update_with(provider_id, |current| {
                if !current.window_elapsed(now) {
                    return None;
                }
                let mut next = current.clone();
                next.quota_used = 0;
                next.reset_at = next_reset_at(current.reset_at, current.window_seconds, now);
                next.version = current.version + 1;
                next.updated_at = now;
                Some(next)
            })
            .await?;

        match updated {
            Some((after, true)) => {
                info!(
                    provider_id = %provider_id,
                    next_reset = %after.reset_at,
                    "Quota window reset"
                );
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    /// Reset every provider whose window elapsed. Returns the reset ids.
    pub async fn reset_all_elapsed(&self) -> StoreResult<Vec<String>> {
        self.reset_all_elapsed_at(Utc::now()).await
    }

    pub async fn reset_all_elapsed_at(&self, now: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let mut reset = Vec::new();
        for record in self.store.list_quotas().await? {
            if record.window_elapsed(now) && self.reset_if_window_elapsed_at(&record.provider_id, now).await? {
                reset.push(record.provider_id);
            }
        }
        debug!("Quota reset sweep: {} providers reset", reset.len());
        Ok(reset)
    }

    /// Zero the counter now regardless of the window (operator reset).
    pub async fn reset_usage_at(&self, provider_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let updated = self
            .update_with(provider_id, |current| {
                if current.quota_used == 0 {
                    return None;
                }
                let mut next = current.clone();
                next.quota_used = 0;
                next.reset_at = next_reset_at(current.reset_at, current.window_seconds, now);
                next.version = current.version + 1;
                next.updated_at = now;
                Some(next)
            })
            .await?;
        Ok(updated.is_some_and(|(_, changed)| changed))
    }

    /// Operator update of the vendor limit and its provenance.
    pub async fn set_limit(
        &self,
        provider_id: &str,
        limit: i64,
        is_actual: bool,
    ) -> StoreResult<Option<QuotaRecord>> {
        let now = Utc::now();
        let updated = self
            .update_with(provider_id, |current| {
                if current.quota_limit == limit && current.is_actual_quota_limit == is_actual {
                    return None;
                }
                let mut next = current.clone();
                next.quota_limit = limit.max(0);
                next.is_actual_quota_limit = is_actual;
                next.quota_used = next.quota_used.min(usage_ceiling(next.quota_limit));
                next.version = current.version + 1;
                next.updated_at = now;
                Some(next)
            })
            .await?;
        if let Some((_, true)) = updated {
            info!(
                provider_id = %provider_id,
                limit,
                is_actual,
                "Quota limit updated"
            );
        }
        Ok(updated.map(|(record, _)| record))
    }

    /// CAS loop over the stored row. Yields the resulting record and whether
    /// a write happened; `Ok(None)` when the provider has no row.
    async fn update_with<F>(
        &self,
        provider_id: &str,
        step: F,
    ) -> StoreResult<Option<(QuotaRecord, bool)>>
    where
        F: Fn(&QuotaRecord) -> Option<QuotaRecord> + Send + Sync,
    {
        let step = &step;
        let result = retry_on_conflict(&self.retry, "quota_records", || async move {
            let Some(current) = self.store.get_quota(provider_id).await? else {
                return Ok(None);
            };
            match step(&current) {
                Some(next) => {
                    self.store.swap_quota(&next, current.version).await?;
                    Ok(Some((next, true)))
                },
                None => Ok(Some((current, false))),
            }
        })
        .await?;

        match result {
            Some((record, changed)) => {
                prometheus::update_quota_gauge(provider_id, record.percentage_used());
                // Concurrent writers can finish out of commit order.
                self.cache
                    .entry(provider_id.to_string())
                    .and_modify(|cached| {
                        if record.version >= cached.version {
                            *cached = record.clone();
                        }
                    })
                    .or_insert_with(|| record.clone());
                Ok(Some((record, changed)))
            },
            None => {
                self.cache.remove(provider_id);
                Ok(None)
            },
        }
    }

    fn log_status_change(&self, record: &QuotaRecord, before: QuotaStatus, after: QuotaStatus) {
        let pct = record.percentage_used();
        match after {
            QuotaStatus::Exceeded | QuotaStatus::Critical => warn!(
                provider_id = %record.provider_id,
                used = record.quota_used,
                limit = record.quota_limit,
                estimated = !record.is_actual_quota_limit,
                "Quota {} -> {} ({:.1}%)",
                before,
                after,
                pct
            ),
            QuotaStatus::Warning | QuotaStatus::Healthy => info!(
                provider_id = %record.provider_id,
                "Quota {} -> {} ({:.1}%)",
                before,
                after,
                pct
            ),
        }
    }
}

//! Ordered candidate list for one logical search.
//!
//! Filters, in order: disabled, circuit open (after lazy promotion of
//! elapsed cool-downs), half-open trial already taken, quota exceeded (after
//! lazy window reset), excluded by the caller. Survivors are sorted by
//! priority ascending with ties broken by provider id. A half-open provider
//! only survives if this selection claims its trial lease.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use farebridge_types::models::{
    CircuitState, ExclusionSummary, ProviderCandidate, QuotaStatus, Selection, SelectionContext,
    ServiceType,
};
use farebridge_types::RoutingError;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::error::AppResult;
use crate::prometheus;
use crate::quota::QuotaTracker;
use crate::registry::ProviderRegistry;

pub struct ProviderSelector {
    registry: Arc<ProviderRegistry>,
    breaker: Arc<CircuitBreaker>,
    quotas: Arc<QuotaTracker>,
}

impl ProviderSelector {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        breaker: Arc<CircuitBreaker>,
        quotas: Arc<QuotaTracker>,
    ) -> Self {
        Self { registry, breaker, quotas }
    }

    pub async fn select(
        &self,
        service_type: ServiceType,
        ctx: &SelectionContext,
    ) -> AppResult<Selection> {
        self.select_at(service_type, ctx, Utc::now()).await
    }

    pub async fn select_at(
        &self,
        service_type: ServiceType,
        ctx: &SelectionContext,
        now: DateTime<Utc>,
    ) -> AppResult<Selection> {
        let lease = self.breaker.config().trial_lease();
        let mut summary = ExclusionSummary::default();
        let mut candidates = Vec::new();

        for provider in self.registry.list_for(service_type) {
            summary.registered += 1;
            if !provider.enabled {
                summary.disabled += 1;
                continue;
            }

            let circuit = self.breaker.promote_if_elapsed_at(&provider.id, now).await?;
            match circuit.state {
                CircuitState::Open => {
                    summary.circuit_open += 1;
                    continue;
                },
                CircuitState::HalfOpen if circuit.trial_in_flight(now, lease) => {
                    summary.trial_in_flight += 1;
                    continue;
                },
                CircuitState::Closed | CircuitState::HalfOpen => {},
            }

            let mut quota = self.quotas.record(&provider.id).await?;
            if quota.as_ref().is_some_and(|q| q.window_elapsed(now)) {
                self.quotas.reset_if_window_elapsed_at(&provider.id, now).await?;
                quota = self.quotas.record(&provider.id).await?;
            }
            let quota_status =
                quota.as_ref().map_or(QuotaStatus::Healthy, |q| self.quotas.status_of(q));
            if quota_status == QuotaStatus::Exceeded {
                summary.quota_exceeded += 1;
                continue;
            }

            if ctx.exclude.iter().any(|id| id == &provider.id) {
                summary.caller_excluded += 1;
                continue;
            }

            let is_trial = circuit.state == CircuitState::HalfOpen;
            if is_trial && !self.breaker.try_claim_trial_at(&provider.id, now).await? {
                summary.trial_in_flight += 1;
                continue;
            }

            candidates.push(ProviderCandidate {
                provider_id: provider.id.clone(),
                priority: provider.priority,
                circuit_state: circuit.state,
                quota_status,
                is_actual_quota_limit: quota.as_ref().is_some_and(|q| q.is_actual_quota_limit),
                is_trial,
            });
        }

        candidates.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then_with(|| a.provider_id.cmp(&b.provider_id))
        });

        let correlation_id = ctx.correlation_id.as_deref().unwrap_or("-");
        if candidates.is_empty() {
            prometheus::record_selection(service_type, "no_eligible_provider");
            let err = RoutingError::NoEligibleProvider { service_type, summary };
            warn!(
                correlation_id = %correlation_id,
                "{}",
                err.operator_message()
            );
            return Err(err.into());
        }

        prometheus::record_selection(service_type, "ok");
        debug!(
            correlation_id = %correlation_id,
            service_type = %service_type,
            candidates = ?candidates.iter().map(|c| c.provider_id.as_str()).collect::<Vec<_>>(),
            "Providers selected"
        );
        Ok(Selection { service_type, candidates, excluded: summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::{MemoryStore, ProviderStore};
    use chrono::Duration;
    use farebridge_types::models::config::{CircuitBreakerConfig, QuotaConfig, RetryConfig};
    use farebridge_types::models::ProviderSeed;

    struct Fixture {
        selector: ProviderSelector,
        breaker: Arc<CircuitBreaker>,
        quotas: Arc<QuotaTracker>,
    }

    async fn fixture(providers: &[(&str, i32, bool)]) -> Fixture {
        let store: Arc<dyn ProviderStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(ProviderRegistry::new(Arc::clone(&store)));
        let breaker = Arc::new(CircuitBreaker::new(
            Arc::clone(&store),
            CircuitBreakerConfig::default(),
            RetryConfig::default(),
        ));
        let quotas =
            Arc::new(QuotaTracker::new(Arc::clone(&store), QuotaConfig::default(), RetryConfig::default()));
        for (id, priority, enabled) in providers {
            registry
                .upsert(&ProviderSeed {
                    id: (*id).to_string(),
                    service_type: ServiceType::Flight,
                    enabled: *enabled,
                    priority: *priority,
                    base_url: "https://example.test".to_string(),
                    health_path: None,
                    quota_limit: Some(100),
                    is_actual_quota_limit: true,
                    quota_window_seconds: Some(86_400),
                })
                .await
                .unwrap();
            breaker.ensure(id).await.unwrap();
            quotas.ensure(id, ServiceType::Flight, Some(100), Some(86_400), true).await.unwrap();
        }
        Fixture {
            selector: ProviderSelector::new(registry, Arc::clone(&breaker), Arc::clone(&quotas)),
            breaker,
            quotas,
        }
    }

    async fn trip(breaker: &CircuitBreaker, id: &str, now: DateTime<Utc>) {
        for _ in 0..3 {
            breaker.record_outcome_at(id, false, now).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_orders_by_priority_then_id() {
        let f = fixture(&[("b", 1, true), ("a", 1, true), ("c", 0, true)]).await;
        let selection = f.selector.select(ServiceType::Flight, &SelectionContext::default()).await.unwrap();
        assert_eq!(selection.provider_ids(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_excludes_disabled_open_and_exceeded() {
        let f = fixture(&[("a", 1, true), ("b", 2, true), ("c", 3, false), ("d", 4, true)]).await;
        let now = Utc::now();
        trip(&f.breaker, "a", now).await;
        f.quotas.record_usage_at("b", 100, now).await.unwrap();

        let selection =
            f.selector.select_at(ServiceType::Flight, &SelectionContext::default(), now).await.unwrap();
        assert_eq!(selection.provider_ids(), vec!["d"]);
        assert_eq!(selection.excluded.disabled, 1);
        assert_eq!(selection.excluded.circuit_open, 1);
        assert_eq!(selection.excluded.quota_exceeded, 1);
    }

    #[tokio::test]
    async fn test_half_open_trial_is_single_use() {
        let f = fixture(&[("a", 1, true), ("b", 2, true)]).await;
        let now = Utc::now();
        trip(&f.breaker, "a", now).await;

        let later = now + Duration::seconds(31);
        let ctx = SelectionContext::default();
        let first = f.selector.select_at(ServiceType::Flight, &ctx, later).await.unwrap();
        assert_eq!(first.provider_ids(), vec!["a", "b"]);
        assert!(first.candidates[0].is_trial);

        let second = f.selector.select_at(ServiceType::Flight, &ctx, later).await.unwrap();
        assert_eq!(second.provider_ids(), vec!["b"]);
        assert_eq!(second.excluded.trial_in_flight, 1);
    }

    #[tokio::test]
    async fn test_caller_exclusions_and_exhaustion() {
        let f = fixture(&[("a", 1, true)]).await;
        let ctx = SelectionContext { correlation_id: Some("s-1".into()), exclude: vec!["a".into()] };

        let err = f.selector.select(ServiceType::Flight, &ctx).await.unwrap_err();
        match err {
            AppError::Routing(RoutingError::NoEligibleProvider { summary, .. }) => {
                assert_eq!(summary.registered, 1);
                assert_eq!(summary.caller_excluded, 1);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_registry_is_no_eligible_provider() {
        let f = fixture(&[]).await;
        let err = f.selector.select(ServiceType::Hotel, &SelectionContext::default()).await.unwrap_err();
        assert!(err.is_no_eligible_provider());
    }

    #[tokio::test]
    async fn test_elapsed_quota_window_is_reset_lazily() {
        let f = fixture(&[("a", 1, true)]).await;
        let now = Utc::now();
        f.quotas.record_usage_at("a", 100, now).await.unwrap();

        let next_day = now + Duration::days(1) + Duration::seconds(1);
        let selection =
            f.selector.select_at(ServiceType::Flight, &SelectionContext::default(), next_day).await.unwrap();
        assert_eq!(selection.provider_ids(), vec!["a"]);
        assert_eq!(selection.candidates[0].quota_status, QuotaStatus::Healthy);
    }
}

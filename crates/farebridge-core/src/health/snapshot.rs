//! System health projection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use farebridge_types::models::{
    CircuitBreakerState, CircuitState, HealthSample, HealthStatus, Provider, QuotaRecord,
    QuotaStatus, QuotaThresholds, SystemHealthSnapshot,
};
use uuid::Uuid;

/// Summarise current state. Disabled providers count toward
/// `total_providers` only.
pub fn build_snapshot(
    providers: &[Provider],
    circuits: &[CircuitBreakerState],
    quotas: &[QuotaRecord],
    latest_samples: &[HealthSample],
    thresholds: &QuotaThresholds,
    now: DateTime<Utc>,
) -> SystemHealthSnapshot {
    let circuits: HashMap<&str, &CircuitBreakerState> =
        circuits.iter().map(|c| (c.provider_id.as_str(), c)).collect();
    let quotas: HashMap<&str, &QuotaRecord> =
        quotas.iter().map(|q| (q.provider_id.as_str(), q)).collect();
    let samples: HashMap<&str, &HealthSample> =
        latest_samples.iter().map(|s| (s.provider_id.as_str(), s)).collect();

    let mut snapshot = SystemHealthSnapshot {
        id: Uuid::new_v4(),
        taken_at: now,
        total_providers: providers.len(),
        available_providers: 0,
        healthy: 0,
        degraded: 0,
        outage: 0,
        unprobed: 0,
        open_circuits: Vec::new(),
        half_open_circuits: Vec::new(),
        critical_quota: Vec::new(),
        exceeded_quota: Vec::new(),
        estimated_quota: Vec::new(),
    };

    for provider in providers.iter().filter(|p| p.enabled) {
        let id = provider.id.as_str();

        match samples.get(id).map(|s| s.status) {
            Some(HealthStatus::Healthy) => snapshot.healthy += 1,
            Some(HealthStatus::Degraded) => snapshot.degraded += 1,
            Some(HealthStatus::Outage) => snapshot.outage += 1,
            None => snapshot.unprobed += 1,
        }

        // Open with an elapsed deadline is half-open in effect.
        let circuit_state = circuits.get(id).map_or(CircuitState::Closed, |c| {
            if c.cooldown_elapsed(now) {
                CircuitState::HalfOpen
            } else {
                c.state
            }
        });
        match circuit_state {
            CircuitState::Open => snapshot.open_circuits.push(provider.id.clone()),
            CircuitState::HalfOpen => snapshot.half_open_circuits.push(provider.id.clone()),
            CircuitState::Closed => {},
        }

        let quota_status = quotas.get(id).map_or(QuotaStatus::Healthy, |q| {
            if q.window_elapsed(now) {
                QuotaStatus::Healthy
            } else {
                q.status(thresholds)
            }
        });
        match quota_status {
            QuotaStatus::Exceeded => snapshot.exceeded_quota.push(provider.id.clone()),
            QuotaStatus::Critical => snapshot.critical_quota.push(provider.id.clone()),
            QuotaStatus::Healthy | QuotaStatus::Warning => {},
        }
        if quotas.get(id).is_some_and(|q| !q.is_actual_quota_limit) {
            snapshot.estimated_quota.push(provider.id.clone());
        }

        if circuit_state != CircuitState::Open && quota_status != QuotaStatus::Exceeded {
            snapshot.available_providers += 1;
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use farebridge_types::models::ServiceType;

    fn provider(id: &str, enabled: bool) -> Provider {
        let now = Utc::now();
        Provider {
            id: id.to_string(),
            service_type: ServiceType::Activity,
            enabled,
            priority: 1,
            base_url: "https://example.test".to_string(),
            health_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_counts_open_exceeded_and_unprobed() {
        let now = Utc::now();
        let providers = vec![provider("a", true), provider("b", true), provider("c", false)];

        let mut open = CircuitBreakerState::closed("a", now);
        open.state = CircuitState::Open;
        open.reopen_after = Some(now + Duration::seconds(30));

        let mut quota = QuotaRecord::new("b", ServiceType::Activity, 10, 3600, false, now);
        quota.quota_used = 10;

        let samples = vec![HealthSample::new("a", HealthStatus::Outage, None, None, now)];
        let snapshot =
            build_snapshot(&providers, &[open], &[quota], &samples, &QuotaThresholds::default(), now);

        assert_eq!(snapshot.total_providers, 3);
        assert_eq!(snapshot.available_providers, 0);
        assert_eq!(snapshot.outage, 1);
        assert_eq!(snapshot.unprobed, 1);
        assert_eq!(snapshot.open_circuits, vec!["a"]);
        assert_eq!(snapshot.exceeded_quota, vec!["b"]);
        assert_eq!(snapshot.estimated_quota, vec!["b"]);
        assert!(!snapshot.overall_healthy());
    }

    #[test]
    fn test_elapsed_open_counts_as_half_open_and_available() {
        let now = Utc::now();
        let mut open = CircuitBreakerState::closed("a", now);
        open.state = CircuitState::Open;
        open.reopen_after = Some(now - Duration::seconds(1));

        let snapshot = build_snapshot(
            &[provider("a", true)],
            &[open],
            &[],
            &[],
            &QuotaThresholds::default(),
            now,
        );
        assert_eq!(snapshot.half_open_circuits, vec!["a"]);
        assert_eq!(snapshot.available_providers, 1);
    }
}

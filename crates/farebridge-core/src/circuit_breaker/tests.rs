use super::*;
use crate::store::MemoryStore;
use chrono::Duration;
use farebridge_types::models::{Provider, ServiceType};

async fn breaker_with(ids: &[&str], config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    for id in ids {
        store
            .upsert_provider(&Provider {
                id: (*id).to_string(),
                service_type: ServiceType::Flight,
                enabled: true,
                priority: 1,
                base_url: "https://example.test".to_string(),
                health_path: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }
    let breaker = Arc::new(CircuitBreaker::new(store, config, RetryConfig::default()));
    for id in ids {
        breaker.ensure(id).await.unwrap();
    }
    breaker
}

#[tokio::test]
async fn test_circuit_breaker_opens_after_failures() {
    let breaker = breaker_with(&["duffel"], CircuitBreakerConfig::default()).await;
    let now = Utc::now();

    breaker.record_outcome_at("duffel", false, now).await.unwrap();
    breaker.record_outcome_at("duffel", false, now).await.unwrap();
    assert!(breaker.is_eligible_at("duffel", now).await.unwrap());

    let state = breaker.record_outcome_at("duffel", false, now).await.unwrap();
    assert_eq!(state.state, CircuitState::Open);
    assert!(state.reopen_after.unwrap() > now);
    assert!(!breaker.is_eligible_at("duffel", now).await.unwrap());
    assert_eq!(breaker.total_trips(), 1);
}

#[tokio::test]
async fn test_success_below_threshold_resets_failures() {
    let breaker = breaker_with(&["duffel"], CircuitBreakerConfig::default()).await;
    let now = Utc::now();

    breaker.record_outcome_at("duffel", false, now).await.unwrap();
    breaker.record_outcome_at("duffel", false, now).await.unwrap();
    let state = breaker.record_outcome_at("duffel", true, now).await.unwrap();

    assert_eq!(state.state, CircuitState::Closed);
    assert_eq!(state.failure_count, 0);
    assert!(breaker.is_eligible_at("duffel", now).await.unwrap());
}

#[tokio::test]
async fn test_half_open_recovery() {
    let breaker = breaker_with(&["duffel"], CircuitBreakerConfig::default()).await;
    let now = Utc::now();
    for _ in 0..3 {
        breaker.record_outcome_at("duffel", false, now).await.unwrap();
    }

    let later = now + Duration::seconds(31);
    let promoted = breaker.promote_if_elapsed_at("duffel", later).await.unwrap();
    assert_eq!(promoted.state, CircuitState::HalfOpen);
    assert!(breaker.try_claim_trial_at("duffel", later).await.unwrap());

    let closed = breaker.record_outcome_at("duffel", true, later).await.unwrap();
    assert_eq!(closed.state, CircuitState::Closed);
    assert_eq!(breaker.get_summary().closed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_trial_claims_admit_exactly_one() {
    let breaker = breaker_with(&["duffel"], CircuitBreakerConfig::default()).await;
    let now = Utc::now();
    for _ in 0..3 {
        breaker.record_outcome_at("duffel", false, now).await.unwrap();
    }
    let later = now + Duration::seconds(31);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let breaker = Arc::clone(&breaker);
        handles.push(tokio::spawn(async move { breaker.try_claim_trial_at("duffel", later).await }));
    }
    let mut claimed = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            claimed += 1;
        }
    }
    assert_eq!(claimed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_failures_are_all_counted() {
    const WRITERS: u32 = 64;
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store
        .upsert_provider(&Provider {
            id: "duffel".to_string(),
            service_type: ServiceType::Flight,
            enabled: true,
            priority: 1,
            base_url: "https://example.test".to_string(),
            health_path: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    // Each round of contention commits one writer, so WRITERS attempts always suffice.
    let retry = RetryConfig { max_attempts: WRITERS, base_delay_ms: 1, max_delay_ms: 5 };
    let config = CircuitBreakerConfig { failure_threshold: 10_000, ..Default::default() };
    let breaker = Arc::new(CircuitBreaker::new(store, config, retry));
    breaker.ensure("duffel").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let breaker = Arc::clone(&breaker);
        handles.push(tokio::spawn(async move { breaker.record_outcome_at("duffel", false, now).await }));
    }
    let mut errors = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            errors += 1;
        }
    }

    assert_eq!(errors, 0);
    let stored = breaker.refresh("duffel").await.unwrap();
    assert_eq!(stored.failure_count, WRITERS);
    assert_eq!(stored.state, CircuitState::Closed);
    assert_eq!(breaker.state("duffel").await.unwrap().version, stored.version);
}

#[tokio::test]
async fn test_force_close_resets_open_circuit() {
    let breaker = breaker_with(&["duffel"], CircuitBreakerConfig::default()).await;
    let now = Utc::now();
    for _ in 0..3 {
        breaker.record_outcome_at("duffel", false, now).await.unwrap();
    }

    assert!(breaker.force_close_at("duffel", now).await.unwrap());
    assert!(!breaker.force_close_at("duffel", now).await.unwrap());
    assert_eq!(breaker.state("duffel").await.unwrap().state, CircuitState::Closed);
}

#[tokio::test]
async fn test_backoff_lengthens_repeated_trips() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        backoff_multiplier: 2.0,
        ..Default::default()
    };
    let breaker = breaker_with(&["duffel"], config).await;
    let now = Utc::now();

    let first = breaker.record_outcome_at("duffel", false, now).await.unwrap();
    assert_eq!(first.reopen_after, Some(now + Duration::seconds(30)));

    let later = now + Duration::seconds(31);
    let second = breaker.record_outcome_at("duffel", false, later).await.unwrap();
    assert_eq!(second.state, CircuitState::Open);
    assert_eq!(second.reopen_after, Some(later + Duration::seconds(60)));
}

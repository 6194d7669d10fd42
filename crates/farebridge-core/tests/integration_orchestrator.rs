#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::unwrap_used, reason = "integration test, panics are the assertion mechanism")]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use farebridge_core::{
    AppError, MemoryStore, Orchestrator, ProviderStore, ReconcileAction, ReconcileRequest,
};
use farebridge_types::models::{
    AttemptOutcome, CircuitState, OrchestratorConfig, ProviderSeed, QuotaStatus,
    SelectionContext, ServiceType,
};
use farebridge_types::RoutingError;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seed(id: &str, priority: i32, quota_limit: i64) -> ProviderSeed {
    ProviderSeed {
        id: id.to_string(),
        service_type: ServiceType::Flight,
        enabled: true,
        priority,
        base_url: format!("https://{id}.example.test"),
        health_path: Some("/health".to_string()),
        quota_limit: Some(quota_limit),
        is_actual_quota_limit: true,
        quota_window_seconds: Some(86_400),
    }
}

async fn orchestrator_with(seeds: Vec<ProviderSeed>) -> (Orchestrator, Arc<dyn ProviderStore>) {
    let store: Arc<dyn ProviderStore> = Arc::new(MemoryStore::new());
    let config = OrchestratorConfig { providers: seeds, ..Default::default() };
    let orchestrator = Orchestrator::with_http_probe(config, Arc::clone(&store)).unwrap();
    orchestrator.bootstrap().await.unwrap();
    (orchestrator, store)
}

fn attempt(correlation_id: &str, provider_id: &str, order: i32, success: bool) -> AttemptOutcome {
    AttemptOutcome {
        correlation_id: correlation_id.to_string(),
        provider_id: provider_id.to_string(),
        attempt_order: order,
        success,
        response_time_ms: Some(120),
        result_count: success.then_some(12),
        error_message: (!success).then(|| "upstream 502".to_string()),
    }
}

async fn trip(orchestrator: &Orchestrator, provider_id: &str, now: DateTime<Utc>) {
    for order in 1..=3 {
        orchestrator
            .record_attempt_outcome_at(attempt("trip", provider_id, order, false), now)
            .await
            .unwrap();
    }
}

async fn select(orchestrator: &Orchestrator, now: DateTime<Utc>) -> Vec<String> {
    orchestrator
        .select_providers_at(ServiceType::Flight, &SelectionContext::default(), now)
        .await
        .unwrap()
        .provider_ids()
}

#[tokio::test]
async fn test_priority_order_then_failover_after_trip() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 1000), seed("b", 2, 1000)]).await;
    let now = Utc::now();

    assert_eq!(select(&orchestrator, now).await, vec!["a", "b"]);

    trip(&orchestrator, "a", now).await;
    assert_eq!(select(&orchestrator, now).await, vec!["b"]);

    let circuit = orchestrator.circuits().await.unwrap().into_iter().find(|c| c.provider_id == "a").unwrap();
    assert_eq!(circuit.state, CircuitState::Open);
    assert!(circuit.reopen_after.unwrap() > now);
}

#[tokio::test]
async fn test_elapsed_open_provider_returns_as_single_trial() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 1000), seed("b", 2, 1000)]).await;
    let now = Utc::now();
    trip(&orchestrator, "a", now).await;

    let later = now + Duration::seconds(31);
    let first = orchestrator
        .select_providers_at(ServiceType::Flight, &SelectionContext::default(), later)
        .await
        .unwrap();
    assert_eq!(first.provider_ids(), vec!["a", "b"]);
    assert!(first.first().unwrap().is_trial);
    assert_eq!(first.first().unwrap().circuit_state, CircuitState::HalfOpen);

    // The trial is taken until its outcome is reported.
    assert_eq!(select(&orchestrator, later).await, vec!["b"]);

    let entry = orchestrator
        .record_attempt_outcome_at(attempt("search-2", "a", 1, true), later)
        .await
        .unwrap();
    assert_eq!(entry.circuit_state_after, CircuitState::Closed);
    assert_eq!(select(&orchestrator, later).await, vec!["a", "b"]);
}

#[tokio::test]
async fn test_failures_below_threshold_then_success_resets_count() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 1000)]).await;
    let now = Utc::now();

    for order in 1..=2 {
        orchestrator.record_attempt_outcome_at(attempt("s", "a", order, false), now).await.unwrap();
    }
    orchestrator.record_attempt_outcome_at(attempt("s", "a", 3, true), now).await.unwrap();

    let circuit = orchestrator.circuits().await.unwrap().remove(0);
    assert_eq!(circuit.state, CircuitState::Closed);
    assert_eq!(circuit.failure_count, 0);
    assert_eq!(select(&orchestrator, now).await, vec!["a"]);
}

#[tokio::test]
async fn test_exhausted_quota_excludes_provider_regardless_of_circuit() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 2), seed("b", 2, 1000)]).await;
    let now = Utc::now();

    orchestrator.record_attempt_outcome_at(attempt("s", "a", 1, true), now).await.unwrap();
    let entry = orchestrator.record_attempt_outcome_at(attempt("s", "a", 2, true), now).await.unwrap();
    assert_eq!(entry.circuit_state_after, CircuitState::Closed);
    assert_eq!(entry.quota_status_after, QuotaStatus::Exceeded);
    assert!(entry.is_actual_quota_limit);

    assert_eq!(select(&orchestrator, now).await, vec!["b"]);
}

#[tokio::test]
async fn test_no_eligible_provider_explains_exclusions() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 1000), seed("b", 2, 1)]).await;
    let now = Utc::now();
    trip(&orchestrator, "a", now).await;
    orchestrator.record_attempt_outcome_at(attempt("s", "b", 1, true), now).await.unwrap();

    let err = orchestrator
        .select_providers_at(ServiceType::Flight, &SelectionContext::default(), now)
        .await
        .unwrap_err();
    assert!(err.is_no_eligible_provider());
    match err {
        AppError::Routing(RoutingError::NoEligibleProvider { summary, .. }) => {
            assert_eq!(summary.registered, 2);
            assert_eq!(summary.circuit_open, 1);
            assert_eq!(summary.quota_exceeded, 1);
        },
        other => panic!("unexpected error: {other}"),
    }

    let empty = orchestrator
        .select_providers_at(ServiceType::Activity, &SelectionContext::default(), now)
        .await
        .unwrap_err();
    assert!(empty.is_no_eligible_provider());
}

#[tokio::test]
async fn test_rotation_log_records_every_attempt_in_order() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 1000), seed("b", 2, 1000)]).await;
    let now = Utc::now();

    orchestrator.record_attempt_outcome_at(attempt("search-1", "a", 1, false), now).await.unwrap();
    orchestrator.record_attempt_outcome_at(attempt("search-1", "b", 2, true), now).await.unwrap();

    let entries = orchestrator.rotation_for("search-1").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].provider_id, "a");
    assert!(!entries[0].success);
    assert_eq!(entries[0].error_message.as_deref(), Some("upstream 502"));
    assert_eq!(entries[1].provider_id, "b");
    assert_eq!(entries[1].result_count, Some(12));

    let quota = orchestrator.quotas().await.unwrap().into_iter().find(|q| q.provider_id == "a").unwrap();
    assert_eq!(quota.quota_used, 1);
}

#[tokio::test]
async fn test_attempt_validation() {
    let (orchestrator, store) = orchestrator_with(vec![seed("a", 1, 1000)]).await;

    let err = orchestrator.record_attempt_outcome(attempt("s", "ghost", 1, false)).await.unwrap_err();
    assert!(err.is_not_found());

    let err = orchestrator.record_attempt_outcome(attempt("s", "a", 0, false)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = orchestrator.record_attempt_outcome(attempt(" ", "a", 1, false)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(orchestrator.rotation_for(" ").await.unwrap().is_empty());

    // Rejected attempts never reach the breaker or the quota counter.
    assert_eq!(store.get_circuit("a").await.unwrap().unwrap().failure_count, 0);
    assert_eq!(store.get_quota("a").await.unwrap().unwrap().quota_used, 0);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let (orchestrator, _) = orchestrator_with(vec![seed("a", 1, 1000), seed("b", 2, 1000)]).await;
    let now = Utc::now();
    trip(&orchestrator, "a", now).await;

    let request = ReconcileRequest { force_close_circuits: true, ..Default::default() };
    let first = orchestrator.reconcile_provider_state_at(&request, now).await.unwrap();
    assert_eq!(first.providers_checked, 2);
    assert_eq!(
        first.actions,
        vec![ReconcileAction::CircuitClosed {
            provider_id: "a".to_string(),
            previous: CircuitState::Open,
            forced: true,
        }]
    );
    assert_eq!(select(&orchestrator, now).await, vec!["a", "b"]);

    let second = orchestrator.reconcile_provider_state_at(&request, now).await.unwrap();
    assert!(second.is_noop());
}

#[tokio::test]
async fn test_bootstrap_twice_keeps_state() {
    let store: Arc<dyn ProviderStore> = Arc::new(MemoryStore::new());
    let config = OrchestratorConfig { providers: vec![seed("a", 1, 1000)], ..Default::default() };

    let first = Orchestrator::with_http_probe(config.clone(), Arc::clone(&store)).unwrap();
    first.bootstrap().await.unwrap();
    first.record_attempt_outcome(attempt("s", "a", 1, false)).await.unwrap();

    let second = Orchestrator::with_http_probe(config, Arc::clone(&store)).unwrap();
    assert_eq!(second.bootstrap().await.unwrap(), 1);
    let circuit = second.circuits().await.unwrap().remove(0);
    assert_eq!(circuit.failure_count, 1);
    assert_eq!(second.quotas().await.unwrap()[0].quota_used, 1);
}

#[tokio::test]
async fn test_cleanup_respects_retention() {
    let (orchestrator, store) = orchestrator_with(vec![seed("a", 1, 1000)]).await;
    let now = Utc::now();

    orchestrator
        .record_attempt_outcome_at(attempt("old", "a", 1, true), now - Duration::days(120))
        .await
        .unwrap();
    orchestrator.record_attempt_outcome_at(attempt("new", "a", 1, true), now).await.unwrap();

    let report = orchestrator.cleanup_stale_data_at(now).await.unwrap();
    assert_eq!(report.rotation_entries, 1);
    assert!(store.rotation_entries("old").await.unwrap().is_empty());
    assert_eq!(store.rotation_entries("new").await.unwrap().len(), 1);

    assert_eq!(orchestrator.cleanup_stale_data_at(now).await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_health_cycle_trips_unreachable_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let mut up = seed("up", 1, 1000);
    up.base_url = server.uri();
    let mut down = seed("down", 2, 1000);
    down.base_url = "http://127.0.0.1:1".to_string();

    let store: Arc<dyn ProviderStore> = Arc::new(MemoryStore::new());
    let mut config = OrchestratorConfig { providers: vec![up, down], ..Default::default() };
    config.circuit_breaker.failure_threshold = 1;
    let orchestrator = Orchestrator::with_http_probe(config, Arc::clone(&store)).unwrap();
    orchestrator.bootstrap().await.unwrap();

    let snapshot = orchestrator.run_health_cycle().await.unwrap();
    assert_eq!(snapshot.healthy, 1);
    assert_eq!(snapshot.outage, 1);
    assert_eq!(snapshot.open_circuits, vec!["down"]);
    assert_eq!(store.latest_snapshot().await.unwrap(), Some(snapshot));

    let live = orchestrator.get_system_health().await.unwrap();
    assert_eq!(live.open_circuits, vec!["down"]);
    assert_eq!(select(&orchestrator, Utc::now()).await, vec!["up"]);
}

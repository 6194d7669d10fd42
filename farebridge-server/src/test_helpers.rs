//! Test helpers for farebridge-server unit tests.

use std::sync::Arc;

use farebridge_core::{MemoryStore, Orchestrator};
use farebridge_types::models::{OrchestratorConfig, ProviderSeed, ServiceType};

use crate::state::AppState;

pub fn seed(id: &str, service_type: ServiceType, priority: i32, quota_limit: i64) -> ProviderSeed {
    ProviderSeed {
        id: id.to_string(),
        service_type,
        enabled: true,
        priority,
        base_url: format!("https://{id}.example.test"),
        health_path: Some("/health".to_string()),
        quota_limit: Some(quota_limit),
        is_actual_quota_limit: true,
        quota_window_seconds: Some(86_400),
    }
}

/// In-memory `AppState` bootstrapped with the given providers.
pub async fn test_app_state_with(providers: Vec<ProviderSeed>) -> AppState {
    let config = OrchestratorConfig { providers, ..Default::default() };
    let orchestrator = Orchestrator::with_http_probe(config, Arc::new(MemoryStore::new()))
        .expect("failed to build test orchestrator");
    orchestrator.bootstrap().await.expect("failed to bootstrap test orchestrator");
    AppState::new(Arc::new(orchestrator), "memory")
}

/// Two flight providers (`amadeus` before `sabre`) and one hotel provider
/// (`expedia`) with a quota of a single call.
pub async fn test_app_state() -> AppState {
    test_app_state_with(vec![
        seed("amadeus", ServiceType::Flight, 1, 1000),
        seed("sabre", ServiceType::Flight, 2, 1000),
        seed("expedia", ServiceType::Hotel, 1, 1),
    ])
    .await
}

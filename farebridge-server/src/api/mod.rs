//! API Routes
//!
//! REST surface over the orchestrator, nested under `/api`.

mod error;
mod health;
mod providers;
mod reconcile;
mod routing;

#[cfg(test)]
mod reconcile_tests;
#[cfg(test)]
mod routing_tests;

pub use error::ApiError;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
    Router,
};
use serde::Serialize;

use farebridge_core::circuit_breaker::CircuitBreakerSummary;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Status
        .route("/status", get(get_status))
        // Search fan-out
        .route("/select", post(routing::select_providers))
        .route("/attempts", post(routing::record_attempt))
        .route("/rotation/:correlation_id", get(routing::get_rotation))
        // Providers
        .route("/providers", get(providers::list_providers).post(providers::register_provider))
        .route("/providers/:id", patch(providers::update_provider))
        .route("/providers/:id/health", get(providers::provider_health_history))
        .route("/providers/:id/rotation", get(providers::provider_rotation))
        .route("/circuits", get(providers::list_circuits))
        .route("/quotas", get(providers::list_quotas))
        .route("/quotas/:id/limit", put(providers::set_quota_limit))
        // Health
        .route("/health", get(health::get_system_health))
        .route("/health/probe", post(health::trigger_probe))
        // Administration
        .route("/reconcile", post(reconcile::reconcile))
        // Prometheus metrics
        .route("/metrics", get(health::get_metrics))
        // API fallback: return 404 for unknown API endpoints
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "not_found", "message": "Not found"})))
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    store: &'static str,
    port: u16,
    uptime_seconds: u64,
    providers: usize,
    enabled_providers: usize,
    circuits: CircuitBreakerSummary,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let orchestrator = state.orchestrator();
    let providers = orchestrator.providers();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.inner.store_kind,
        port: state.bound_port(),
        uptime_seconds: state.uptime_seconds(),
        enabled_providers: providers.iter().filter(|p| p.enabled).count(),
        providers: providers.len(),
        circuits: orchestrator.circuit_summary(),
    })
}

//! System health, ad hoc probing and Prometheus metrics.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use tracing::warn;

use farebridge_core::prometheus;
use farebridge_types::models::SystemHealthSnapshot;

use super::ApiError;
use crate::state::AppState;

pub async fn get_system_health(
    State(state): State<AppState>,
) -> Result<Json<SystemHealthSnapshot>, ApiError> {
    Ok(Json(state.orchestrator().get_system_health().await?))
}

/// Run a probe cycle now instead of waiting for the schedule.
pub async fn trigger_probe(
    State(state): State<AppState>,
) -> Result<Json<SystemHealthSnapshot>, ApiError> {
    Ok(Json(state.orchestrator().run_health_cycle().await?))
}

pub async fn get_metrics(State(state): State<AppState>) -> Response {
    // The live projection refreshes the provider gauges.
    if let Err(e) = state.orchestrator().get_system_health().await {
        warn!("Provider gauges not refreshed: {}", e);
    }
    let metrics = prometheus::render_metrics();

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], metrics).into_response()
}

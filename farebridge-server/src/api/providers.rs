//! Provider catalogue and per-provider state views.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use farebridge_types::models::{
    CircuitBreakerState, HealthSample, Provider, ProviderSeed, ProviderUpdate, QuotaRecord,
    QuotaStatus, RotationLogEntry,
};

use super::ApiError;
use crate::state::AppState;

pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<Provider>> {
    Json(state.orchestrator().providers())
}

pub async fn register_provider(
    State(state): State<AppState>,
    Json(seed): Json<ProviderSeed>,
) -> Result<(StatusCode, Json<Provider>), ApiError> {
    let provider = state.orchestrator().register_provider(&seed).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ProviderUpdate>,
) -> Result<Json<Provider>, ApiError> {
    Ok(Json(state.orchestrator().update_provider(&id, &update).await?))
}

pub async fn list_circuits(
    State(state): State<AppState>,
) -> Result<Json<Vec<CircuitBreakerState>>, ApiError> {
    Ok(Json(state.orchestrator().circuits().await?))
}

/// Quota row with its derived figures.
#[derive(Debug, Serialize)]
pub struct QuotaView {
    #[serde(flatten)]
    pub record: QuotaRecord,
    pub percentage_used: f64,
    pub status: QuotaStatus,
    pub remaining: i64,
}

pub async fn list_quotas(State(state): State<AppState>) -> Result<Json<Vec<QuotaView>>, ApiError> {
    let orchestrator = state.orchestrator();
    let tracker = orchestrator.quota_tracker();
    let views = orchestrator
        .quotas()
        .await?
        .into_iter()
        .map(|record| QuotaView {
            percentage_used: record.percentage_used(),
            status: tracker.status_of(&record),
            remaining: record.remaining(),
            record,
        })
        .collect();
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct SetLimitRequest {
    pub limit: i64,
    /// Whether the limit is the vendor's published figure rather than an estimate
    #[serde(default)]
    pub is_actual: bool,
}

pub async fn set_quota_limit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetLimitRequest>,
) -> Result<Json<QuotaRecord>, ApiError> {
    let record = state.orchestrator().set_quota_limit(&id, request.limit, request.is_actual).await?;
    Ok(Json(record))
}

const DEFAULT_HISTORY_HOURS: i64 = 24;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Look-back window (default 24h)
    pub hours: Option<i64>,
}

impl HistoryQuery {
    fn since(&self) -> chrono::DateTime<Utc> {
        Utc::now() - Duration::hours(self.hours.unwrap_or(DEFAULT_HISTORY_HOURS).clamp(1, 24 * 90))
    }
}

pub async fn provider_health_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HealthSample>>, ApiError> {
    Ok(Json(state.orchestrator().health_history(&id, query.since()).await?))
}

pub async fn provider_rotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<RotationLogEntry>>, ApiError> {
    Ok(Json(state.orchestrator().recent_rotation_for_provider(&id, query.since()).await?))
}

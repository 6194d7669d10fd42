//! Search fan-out endpoints: candidate selection and attempt reporting.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use farebridge_types::models::{
    AttemptOutcome, RotationLogEntry, Selection, SelectionContext, ServiceType,
};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub service_type: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Ordered candidates for one search. A missing correlation id is generated
/// so the caller can tie its attempts together.
pub async fn select_providers(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<Selection>, ApiError> {
    let service_type: ServiceType = request.service_type.parse()?;
    let ctx = SelectionContext {
        correlation_id: Some(request.correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string())),
        exclude: request.exclude,
    };
    let selection = state.orchestrator().select_providers(service_type, &ctx).await?;
    Ok(Json(selection))
}

pub async fn record_attempt(
    State(state): State<AppState>,
    Json(outcome): Json<AttemptOutcome>,
) -> Result<Json<RotationLogEntry>, ApiError> {
    let entry = state.orchestrator().record_attempt_outcome(outcome).await?;
    Ok(Json(entry))
}

pub async fn get_rotation(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Result<Json<Vec<RotationLogEntry>>, ApiError> {
    Ok(Json(state.orchestrator().rotation_for(&correlation_id).await?))
}

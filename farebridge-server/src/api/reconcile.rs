use axum::extract::State;
use axum::response::Json;

use farebridge_core::{ReconcileReport, ReconcileRequest};

use super::ApiError;
use crate::state::AppState;

pub async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileReport>, ApiError> {
    Ok(Json(state.orchestrator().reconcile_provider_state(&request).await?))
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use farebridge_core::{ReconcileAction, ReconcileRequest};
use farebridge_types::models::{AttemptOutcome, CircuitState};

use super::reconcile::reconcile;
use crate::test_helpers::test_app_state;

#[tokio::test]
async fn test_reconcile_clean_state_is_noop() {
    let state = test_app_state().await;
    let Json(report) = reconcile(State(state), Json(ReconcileRequest::default())).await.unwrap();
    assert_eq!(report.providers_checked, 3);
    assert!(report.is_noop());
}

#[tokio::test]
async fn test_forced_reconcile_closes_tripped_circuit_once() {
    let state = test_app_state().await;
    for order in 1..=3 {
        state
            .orchestrator()
            .record_attempt_outcome(AttemptOutcome {
                correlation_id: "s".to_string(),
                provider_id: "sabre".to_string(),
                attempt_order: order,
                success: false,
                response_time_ms: None,
                result_count: None,
                error_message: Some("timeout".to_string()),
            })
            .await
            .unwrap();
    }

    let request = ReconcileRequest {
        provider_ids: vec!["sabre".to_string()],
        force_close_circuits: true,
        ..Default::default()
    };
    let Json(report) = reconcile(State(state.clone()), Json(request.clone())).await.unwrap();
    assert_eq!(
        report.actions,
        vec![ReconcileAction::CircuitClosed {
            provider_id: "sabre".to_string(),
            previous: CircuitState::Open,
            forced: true,
        }]
    );

    let Json(again) = reconcile(State(state), Json(request)).await.unwrap();
    assert!(again.is_noop());
}

#[tokio::test]
async fn test_reconcile_unknown_provider_is_404() {
    let state = test_app_state().await;
    let request = ReconcileRequest { provider_ids: vec!["ghost".to_string()], ..Default::default() };
    let err = reconcile(State(state), Json(request)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

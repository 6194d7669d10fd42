use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use farebridge_types::models::{AttemptOutcome, CircuitState, QuotaStatus};

use super::routing::{get_rotation, record_attempt, select_providers, SelectRequest};
use crate::test_helpers::test_app_state;

fn select_request(service_type: &str, exclude: &[&str]) -> SelectRequest {
    SelectRequest {
        service_type: service_type.to_string(),
        exclude: exclude.iter().map(|s| (*s).to_string()).collect(),
        correlation_id: Some("search-1".to_string()),
    }
}

fn outcome(provider_id: &str, attempt_order: i32, success: bool) -> AttemptOutcome {
    AttemptOutcome {
        correlation_id: "search-1".to_string(),
        provider_id: provider_id.to_string(),
        attempt_order,
        success,
        response_time_ms: Some(340),
        result_count: success.then_some(25),
        error_message: None,
    }
}

#[tokio::test]
async fn test_select_orders_by_priority() {
    let state = test_app_state().await;
    let Json(selection) = select_providers(State(state), Json(select_request("flight", &[]))).await.unwrap();
    assert_eq!(selection.provider_ids(), vec!["amadeus", "sabre"]);
}

#[tokio::test]
async fn test_select_honours_exclusions() {
    let state = test_app_state().await;
    let Json(selection) =
        select_providers(State(state), Json(select_request("flights", &["amadeus"]))).await.unwrap();
    assert_eq!(selection.provider_ids(), vec!["sabre"]);
    assert_eq!(selection.excluded.caller_excluded, 1);
}

#[tokio::test]
async fn test_select_invalid_service_type_is_400() {
    let state = test_app_state().await;
    let err = select_providers(State(state), Json(select_request("cruise", &[]))).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_exhausted_quota_makes_search_unavailable() {
    let state = test_app_state().await;
    let Json(entry) = record_attempt(State(state.clone()), Json(outcome("expedia", 1, true))).await.unwrap();
    assert_eq!(entry.quota_status_after, QuotaStatus::Exceeded);

    let err = select_providers(State(state), Json(select_request("hotel", &[]))).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_attempts_trip_circuit_and_are_logged() {
    let state = test_app_state().await;
    for order in 1..=3 {
        let Json(entry) =
            record_attempt(State(state.clone()), Json(outcome("amadeus", order, false))).await.unwrap();
        let expected = if order < 3 { CircuitState::Closed } else { CircuitState::Open };
        assert_eq!(entry.circuit_state_after, expected);
    }

    let Json(selection) =
        select_providers(State(state.clone()), Json(select_request("flight", &[]))).await.unwrap();
    assert_eq!(selection.provider_ids(), vec!["sabre"]);

    let Json(entries) = get_rotation(State(state), Path("search-1".to_string())).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.provider_id == "amadeus" && !e.success));
}

#[tokio::test]
async fn test_attempt_for_unknown_provider_is_404() {
    let state = test_app_state().await;
    let err = record_attempt(State(state), Json(outcome("ghost", 1, true))).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

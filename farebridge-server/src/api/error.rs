//! HTTP mapping of orchestrator errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use farebridge_core::{AppError, StoreError};
use farebridge_types::RoutingError;
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub struct ApiError(pub AppError);

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_detail: Option<String>,
}

impl ApiError {
    pub fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match &self.0 {
            AppError::Routing(err @ RoutingError::NoEligibleProvider { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: "search_unavailable",
                    message: err.user_message(),
                    operator_detail: Some(err.operator_message()),
                },
            ),
            AppError::Routing(RoutingError::UnknownProvider { .. })
            | AppError::Store(StoreError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                ErrorBody { error: "not_found", message: self.0.to_string(), operator_detail: None },
            ),
            AppError::Routing(RoutingError::InvalidServiceType { .. })
            | AppError::InvalidInput(_)
            | AppError::Config(_) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: "invalid_request", message: self.0.to_string(), operator_detail: None },
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { error: "internal", message: other.to_string(), operator_detail: None },
            ),
        }
    }
}

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("API request failed: {}", self.0);
        }
        (status, Json(body)).into_response()
    }
}

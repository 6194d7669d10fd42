//! Unified error types for Farebridge Core.

use farebridge_types::{ConfigError, ProbeError, RoutingError};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Main error type for orchestrator operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Selection or registry lookup failed.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Persistence layer failed, including unresolved state conflicts.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A health probe failed outside the monitor (manual probe of one provider).
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// HTTP client could not be built.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller supplied an invalid argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// True when the error is a capacity problem rather than a fault.
    pub fn is_no_eligible_provider(&self) -> bool {
        matches!(self, Self::Routing(RoutingError::NoEligibleProvider { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Routing(RoutingError::UnknownProvider { .. }) | Self::Store(StoreError::NotFound(_))
        )
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for orchestrator operations.
pub type AppResult<T> = Result<T, AppError>;

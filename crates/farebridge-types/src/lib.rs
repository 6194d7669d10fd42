//! # Farebridge Types
//!
//! Core types, models, and error definitions for the Farebridge provider
//! routing engine.
//!
//! - **`error`** - Typed error hierarchy for routing, probing, and configuration
//! - **`models`** - Domain models (Provider, circuit and quota state, health, rotation log)
//! - **`models::config`** - Injected engine configuration with documented defaults
//!
//! ## Architecture Role
//!
//! `farebridge-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                farebridge-types (this crate)
//!                        │
//!                        ▼
//!                 farebridge-core
//!                        │
//!                        ▼
//!                farebridge-server
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for API and persistence
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, ProbeError, Result, RoutingError, TypedError};

// Re-export core model types
pub use models::{
    AttemptOutcome, CircuitBreakerState, CircuitState, ExclusionSummary, HealthSample,
    HealthStatus, OrchestratorConfig, Provider, ProviderCandidate, ProviderSeed, ProviderUpdate,
    QuotaRecord, QuotaStatus, QuotaThresholds, RotationLogEntry, Selection, SelectionContext,
    ServiceType, SystemHealthSnapshot,
};

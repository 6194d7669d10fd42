//! Core domain models for the Farebridge routing engine.
//!
//! `Provider` is the root entity. Circuit-breaker and quota state are 1:1
//! dependents keyed by provider id; health samples and rotation log entries
//! are append-only children.

pub mod config;
mod circuit;
mod health;
mod provider;
mod quota;
mod rotation;
mod selection;

pub use circuit::{CircuitBreakerState, CircuitState};
pub use config::OrchestratorConfig;
pub use health::{HealthSample, HealthStatus, SystemHealthSnapshot};
pub use provider::{Provider, ProviderSeed, ProviderUpdate, ServiceType};
pub use quota::{QuotaRecord, QuotaStatus, QuotaThresholds};
pub use rotation::{AttemptOutcome, RotationLogEntry};
pub use selection::{ExclusionSummary, ProviderCandidate, Selection, SelectionContext};

//! # Farebridge Core
//!
//! Provider failover and quota-aware routing engine.
//!
//! ## Architecture
//!
//! ```text
//! farebridge-core/src/
//! ├── registry.rs         # Provider catalogue per service type
//! ├── circuit_breaker/    # Per-provider closed/open/half-open state machine
//! ├── quota/              # Rolling-window usage counters and status bands
//! ├── health/             # Periodic prober + system health snapshot
//! ├── selector.rs         # Ordered candidate list per search
//! ├── rotation.rs         # Append-only attempt audit log
//! ├── orchestrator.rs     # Facade used by the search fan-out
//! ├── reconcile.rs        # Idempotent administrative state reset
//! ├── store/              # ProviderStore trait, memory + PostgreSQL backends
//! ├── retry.rs            # Backoff for compare-and-swap conflicts
//! └── prometheus.rs       # Metrics endpoint
//! ```
//!
//! Control flow: the health monitor probes on a schedule and feeds the
//! circuit breaker; the selector reads breaker and quota state per request;
//! the caller reports each real attempt back through
//! [`Orchestrator::record_attempt_outcome`], which updates breaker, quota and
//! the rotation log in one explicit call.

#![allow(
    clippy::significant_drop_tightening,
    reason = "lock guards in async code require careful lifetime management"
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp))]

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod prometheus;
pub mod quota;
pub mod reconcile;
pub mod registry;
pub mod retry;
pub mod rotation;
pub mod selector;
pub mod store;

pub use circuit_breaker::CircuitBreaker;
pub use error::{AppError, AppResult};
pub use health::{HealthMonitor, HttpProbe, ProbeReport, ProviderProbe};
pub use orchestrator::{CleanupReport, Orchestrator};
pub use quota::QuotaTracker;
pub use reconcile::{ReconcileAction, ReconcileReport, ReconcileRequest};
pub use registry::ProviderRegistry;
pub use rotation::RotationLogger;
pub use selector::ProviderSelector;
pub use store::{MemoryStore, PostgresStore, ProviderStore, StoreError, StoreResult};

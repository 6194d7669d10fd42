//! Provider health monitoring.
//!
//! A probe result becomes a [`HealthSample`](farebridge_types::models::HealthSample)
//! and a circuit-breaker outcome. Snapshots summarise the whole fleet and are
//! kept as history; they are never read back to make routing decisions.

mod monitor;
mod probe;
pub mod snapshot;


pub use monitor::HealthMonitor;
pub use probe::{HttpProbe, ProbeReport, ProviderProbe};
pub use snapshot::build_snapshot;

//! Persistence abstraction for provider routing state.
//!
//! Circuit-breaker and quota rows are written with compare-and-swap on their
//! `version` column: a write succeeds only if the stored version equals the
//! version the writer read. A mismatch is reported as
//! [`StoreError::Conflict`] and retried by the caller (see [`crate::retry`]).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farebridge_types::models::{
    CircuitBreakerState, HealthSample, Provider, QuotaRecord, RotationLogEntry,
    SystemHealthSnapshot,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    /// Concurrent write on circuit or quota state
    #[error("State update conflict on {entity} {key} (expected version {expected_version})")]
    Conflict { entity: &'static str, key: String, expected_version: i64 },
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub(crate) fn circuit_conflict(key: &str, expected_version: i64) -> Self {
        Self::Conflict { entity: "circuit_breaker_state", key: key.to_string(), expected_version }
    }

    pub(crate) fn quota_conflict(key: &str, expected_version: i64) -> Self {
        Self::Conflict { entity: "quota_records", key: key.to_string(), expected_version }
    }
}

#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn list_providers(&self) -> StoreResult<Vec<Provider>>;
    async fn get_provider(&self, id: &str) -> StoreResult<Provider>;
    async fn upsert_provider(&self, provider: &Provider) -> StoreResult<()>;

    async fn list_circuits(&self) -> StoreResult<Vec<CircuitBreakerState>>;
    async fn get_circuit(&self, provider_id: &str) -> StoreResult<Option<CircuitBreakerState>>;
    /// Insert `state` unless a row exists; returns the stored row either way.
    async fn init_circuit(&self, state: &CircuitBreakerState) -> StoreResult<CircuitBreakerState>;
    /// Replace the row iff its stored version equals `expected_version`.
    async fn swap_circuit(
        &self,
        next: &CircuitBreakerState,
        expected_version: i64,
    ) -> StoreResult<()>;

    async fn list_quotas(&self) -> StoreResult<Vec<QuotaRecord>>;
    async fn get_quota(&self, provider_id: &str) -> StoreResult<Option<QuotaRecord>>;
    /// Insert `record` unless a row exists; returns the stored row either way.
    async fn init_quota(&self, record: &QuotaRecord) -> StoreResult<QuotaRecord>;
    /// Replace the row iff its stored version equals `expected_version`.
    async fn swap_quota(&self, next: &QuotaRecord, expected_version: i64) -> StoreResult<()>;

    async fn append_health_sample(&self, sample: &HealthSample) -> StoreResult<()>;
    /// Most recent sample per provider.
    async fn latest_health_samples(&self) -> StoreResult<Vec<HealthSample>>;
    async fn health_samples_since(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<HealthSample>>;

    async fn save_snapshot(&self, snapshot: &SystemHealthSnapshot) -> StoreResult<()>;
    async fn latest_snapshot(&self) -> StoreResult<Option<SystemHealthSnapshot>>;

    async fn append_rotation_entry(&self, entry: &RotationLogEntry) -> StoreResult<()>;
    /// Entries of one logical search, ordered by `attempt_order`.
    async fn rotation_entries(&self, correlation_id: &str) -> StoreResult<Vec<RotationLogEntry>>;
    async fn rotation_entries_since(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<RotationLogEntry>>;

    /// Delete health samples checked before `cutoff`; returns rows removed.
    async fn purge_health_samples(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
    async fn purge_snapshots(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
    async fn purge_rotation_log(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

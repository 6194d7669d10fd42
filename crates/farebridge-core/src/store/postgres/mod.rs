//! PostgreSQL implementation of the provider store.

mod helpers;
mod providers;
mod state;
mod telemetry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farebridge_types::models::{
    CircuitBreakerState, HealthSample, Provider, QuotaRecord, RotationLogEntry,
    SystemHealthSnapshot,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::{ProviderStore, StoreError, StoreResult};
use providers::{get_provider_impl, list_providers_impl, upsert_provider_impl};
use state::{
    get_circuit_impl, get_quota_impl, init_circuit_impl, init_quota_impl, list_circuits_impl,
    list_quotas_impl, swap_circuit_impl, swap_quota_impl,
};
use telemetry::{
    append_health_sample_impl, append_rotation_entry_impl, health_samples_since_impl,
    latest_health_samples_impl, latest_snapshot_impl, purge_before_impl,
    rotation_entries_impl, rotation_entries_since_impl, save_snapshot_impl, RetainedTable,
};

/// PostgreSQL-backed provider store.
pub struct PostgresStore {
    /// Database connection pool.
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect to database and create store.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))
    }
}

#[async_trait]
impl ProviderStore for PostgresStore {
    async fn list_providers(&self) -> StoreResult<Vec<Provider>> {
        list_providers_impl(&self.pool).await
    }

    async fn get_provider(&self, id: &str) -> StoreResult<Provider> {
        get_provider_impl(&self.pool, id).await
    }

    async fn upsert_provider(&self, provider: &Provider) -> StoreResult<()> {
        upsert_provider_impl(&self.pool, provider).await
    }

    async fn list_circuits(&self) -> StoreResult<Vec<CircuitBreakerState>> {
        list_circuits_impl(&self.pool).await
    }

    async fn get_circuit(&self, provider_id: &str) -> StoreResult<Option<CircuitBreakerState>> {
        get_circuit_impl(&self.pool, provider_id).await
    }

    async fn init_circuit(&self, state: &CircuitBreakerState) -> StoreResult<CircuitBreakerState> {
        init_circuit_impl(&self.pool, state).await
    }

    async fn swap_circuit(
        &self,
        next: &CircuitBreakerState,
        expected_version: i64,
    ) -> StoreResult<()> {
        swap_circuit_impl(&self.pool, next, expected_version).await
    }

    async fn list_quotas(&self) -> StoreResult<Vec<QuotaRecord>> {
        list_quotas_impl(&self.pool).await
    }

    async fn get_quota(&self, provider_id: &str) -> StoreResult<Option<QuotaRecord>> {
        get_quota_impl(&self.pool, provider_id).await
    }

    async fn init_quota(&self, record: &QuotaRecord) -> StoreResult<QuotaRecord> {
        init_quota_impl(&self.pool, record).await
    }

    async fn swap_quota(&self, next: &QuotaRecord, expected_version: i64) -> StoreResult<()> {
        swap_quota_impl(&self.pool, next, expected_version).await
    }

    async fn append_health_sample(&self, sample: &HealthSample) -> StoreResult<()> {
        append_health_sample_impl(&self.pool, sample).await
    }

    async fn latest_health_samples(&self) -> StoreResult<Vec<HealthSample>> {
        latest_health_samples_impl(&self.pool).await
    }

    async fn health_samples_since(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<HealthSample>> {
        health_samples_since_impl(&self.pool, provider_id, since).await
    }

    async fn save_snapshot(&self, snapshot: &SystemHealthSnapshot) -> StoreResult<()> {
        save_snapshot_impl(&self.pool, snapshot).await
    }

    async fn latest_snapshot(&self) -> StoreResult<Option<SystemHealthSnapshot>> {
        latest_snapshot_impl(&self.pool).await
    }

    async fn append_rotation_entry(&self, entry: &RotationLogEntry) -> StoreResult<()> {
        append_rotation_entry_impl(&self.pool, entry).await
    }

    async fn rotation_entries(&self, correlation_id: &str) -> StoreResult<Vec<RotationLogEntry>> {
        rotation_entries_impl(&self.pool, correlation_id).await
    }

    async fn rotation_entries_since(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<RotationLogEntry>> {
        rotation_entries_since_impl(&self.pool, provider_id, since).await
    }

    async fn purge_health_samples(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        purge_before_impl(&self.pool, RetainedTable::HealthSamples, cutoff).await
    }

    async fn purge_snapshots(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        purge_before_impl(&self.pool, RetainedTable::Snapshots, cutoff).await
    }

    async fn purge_rotation_log(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        purge_before_impl(&self.pool, RetainedTable::RotationLog, cutoff).await
    }
}

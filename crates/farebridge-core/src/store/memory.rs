//! In-process store used when no database is configured, and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farebridge_types::models::{
    CircuitBreakerState, HealthSample, Provider, QuotaRecord, RotationLogEntry,
    SystemHealthSnapshot,
};
use parking_lot::RwLock;

use super::{ProviderStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    providers: HashMap<String, Provider>,
    circuits: HashMap<String, CircuitBreakerState>,
    quotas: HashMap<String, QuotaRecord>,
    health_samples: Vec<HealthSample>,
    snapshots: Vec<SystemHealthSnapshot>,
    rotation_log: Vec<RotationLogEntry>,
}

/// Volatile [`ProviderStore`] with the same compare-and-swap semantics as
/// the PostgreSQL backend.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_provider(tables: &Tables, provider_id: &str) -> StoreResult<()> {
        if tables.providers.contains_key(provider_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("provider {provider_id}")))
        }
    }
}

fn sorted_by_id<T: Clone>(values: impl Iterator<Item = T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut out: Vec<T> = values.collect();
    out.sort_by(|a, b| key(a).cmp(key(b)));
    out
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn list_providers(&self) -> StoreResult<Vec<Provider>> {
        let tables = self.tables.read();
        Ok(sorted_by_id(tables.providers.values().cloned(), |p| p.id.as_str()))
    }

    async fn get_provider(&self, id: &str) -> StoreResult<Provider> {
        self.tables
            .read()
            .providers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("provider {id}")))
    }

    async fn upsert_provider(&self, provider: &Provider) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let created_at = tables.providers.get(&provider.id).map(|existing| existing.created_at);
        let mut row = provider.clone();
        if let Some(created_at) = created_at {
            row.created_at = created_at;
        }
        tables.providers.insert(row.id.clone(), row);
        Ok(())
    }

    async fn list_circuits(&self) -> StoreResult<Vec<CircuitBreakerState>> {
        let tables = self.tables.read();
        Ok(sorted_by_id(tables.circuits.values().cloned(), |c| c.provider_id.as_str()))
    }

    async fn get_circuit(&self, provider_id: &str) -> StoreResult<Option<CircuitBreakerState>> {
        Ok(self.tables.read().circuits.get(provider_id).cloned())
    }

    async fn init_circuit(&self, state: &CircuitBreakerState) -> StoreResult<CircuitBreakerState> {
        let mut tables = self.tables.write();
        Self::require_provider(&tables, &state.provider_id)?;
        Ok(tables.circuits.entry(state.provider_id.clone()).or_insert_with(|| state.clone()).clone())
    }

    async fn swap_circuit(
        &self,
        next: &CircuitBreakerState,
        expected_version: i64,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write();
        match tables.circuits.get_mut(&next.provider_id) {
            Some(row) if row.version == expected_version => {
                *row = next.clone();
                Ok(())
            },
            Some(_) => Err(StoreError::circuit_conflict(&next.provider_id, expected_version)),
            None => Err(StoreError::NotFound(format!("circuit {}", next.provider_id))),
        }
    }

    async fn list_quotas(&self) -> StoreResult<Vec<QuotaRecord>> {
        let tables = self.tables.read();
        Ok(sorted_by_id(tables.quotas.values().cloned(), |q| q.provider_id.as_str()))
    }

    async fn get_quota(&self, provider_id: &str) -> StoreResult<Option<QuotaRecord>> {
        Ok(self.tables.read().quotas.get(provider_id).cloned())
    }

    async fn init_quota(&self, record: &QuotaRecord) -> StoreResult<QuotaRecord> {
        let mut tables = self.tables.write();
        Self::require_provider(&tables, &record.provider_id)?;
        Ok(tables.quotas.entry(record.provider_id.clone()).or_insert_with(|| record.clone()).clone())
    }

    async fn swap_quota(&self, next: &QuotaRecord, expected_version: i64) -> StoreResult<()> {
        let mut tables = self.tables.write();
        match tables.quotas.get_mut(&next.provider_id) {
            Some(row) if row.version == expected_version => {
                *row = next.clone();
                Ok(())
            },
            Some(_) => Err(StoreError::quota_conflict(&next.provider_id, expected_version)),
            None => Err(StoreError::NotFound(format!("quota {}", next.provider_id))),
        }
    }

    async fn append_health_sample(&self, sample: &HealthSample) -> StoreResult<()> {
        let mut tables = self.tables.write();
        Self::require_provider(&tables, &sample.provider_id)?;
        tables.health_samples.push(sample.clone());
        Ok(())
    }

    async fn latest_health_samples(&self) -> StoreResult<Vec<HealthSample>> {
        let tables = self.tables.read();
        let mut latest: HashMap<&str, &HealthSample> = HashMap::new();
        for sample in &tables.health_samples {
            let slot = latest.entry(sample.provider_id.as_str()).or_insert(sample);
            if sample.checked_at >= slot.checked_at {
                *slot = sample;
            }
        }
        Ok(sorted_by_id(latest.into_values().cloned(), |s| s.provider_id.as_str()))
    }

    async fn health_samples_since(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<HealthSample>> {
        let tables = self.tables.read();
        let mut samples: Vec<HealthSample> = tables
            .health_samples
            .iter()
            .filter(|s| s.provider_id == provider_id && s.checked_at >= since)
            .cloned()
            .collect();
        samples.sort_by_key(|s| s.checked_at);
        Ok(samples)
    }

    async fn save_snapshot(&self, snapshot: &SystemHealthSnapshot) -> StoreResult<()> {
        self.tables.write().snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self) -> StoreResult<Option<SystemHealthSnapshot>> {
        Ok(self.tables.read().snapshots.iter().max_by_key(|s| s.taken_at).cloned())
    }

    async fn append_rotation_entry(&self, entry: &RotationLogEntry) -> StoreResult<()> {
        let mut tables = self.tables.write();
        Self::require_provider(&tables, &entry.provider_id)?;
        tables.rotation_log.push(entry.clone());
        Ok(())
    }

    async fn rotation_entries(&self, correlation_id: &str) -> StoreResult<Vec<RotationLogEntry>> {
        let tables = self.tables.read();
        let mut entries: Vec<RotationLogEntry> = tables
            .rotation_log
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.attempt_order, e.created_at));
        Ok(entries)
    }

    async fn rotation_entries_since(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<RotationLogEntry>> {
        let tables = self.tables.read();
        let mut entries: Vec<RotationLogEntry> = tables
            .rotation_log
            .iter()
            .filter(|e| e.provider_id == provider_id && e.created_at >= since)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn purge_health_samples(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let before = tables.health_samples.len();
        tables.health_samples.retain(|s| s.checked_at >= cutoff);
        Ok((before - tables.health_samples.len()) as u64)
    }

    async fn purge_snapshots(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let before = tables.snapshots.len();
        tables.snapshots.retain(|s| s.taken_at >= cutoff);
        Ok((before - tables.snapshots.len()) as u64)
    }

    async fn purge_rotation_log(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let before = tables.rotation_log.len();
        tables.rotation_log.retain(|e| e.created_at >= cutoff);
        Ok((before - tables.rotation_log.len()) as u64)
    }
}

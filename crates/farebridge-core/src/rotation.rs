//! Append-only audit log of provider attempts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use farebridge_types::models::RotationLogEntry;
use tracing::debug;

use crate::store::{ProviderStore, StoreResult};

pub struct RotationLogger {
    store: Arc<dyn ProviderStore>,
}

impl RotationLogger {
    pub fn new(store: Arc<dyn ProviderStore>) -> Self {
        Self { store }
    }

    pub async fn append(&self, entry: &RotationLogEntry) -> StoreResult<()> {
        self.store.append_rotation_entry(entry).await?;
        debug!(
            correlation_id = %entry.correlation_id,
            provider_id = %entry.provider_id,
            attempt = entry.attempt_order,
            success = entry.success,
            "Rotation attempt logged"
        );
        Ok(())
    }

    /// Attempts of one logical search, in attempt order.
    pub async fn entries_for(&self, correlation_id: &str) -> StoreResult<Vec<RotationLogEntry>> {
        self.store.rotation_entries(correlation_id).await
    }

    pub async fn recent_for_provider(
        &self,
        provider_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<RotationLogEntry>> {
        self.store.rotation_entries_since(provider_id, since).await
    }
}

//! Provider catalogue per service type.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use farebridge_types::models::{Provider, ProviderSeed, ProviderUpdate, ServiceType};
use farebridge_types::RoutingError;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::store::{ProviderStore, StoreError};

pub struct ProviderRegistry {
    store: Arc<dyn ProviderStore>,
    providers: DashMap<String, Provider>,
}

impl ProviderRegistry {
    pub fn new(store: Arc<dyn ProviderStore>) -> Self {
        Self { store, providers: DashMap::new() }
    }

    /// Reload the cache from the store.
    pub async fn load(&self) -> AppResult<usize> {
        let rows = self.store.list_providers().await?;
        self.providers.clear();
        for provider in rows {
            self.providers.insert(provider.id.clone(), provider);
        }
        Ok(self.providers.len())
    }

    /// Insert or update a provider from a seed that has already been
    /// validated. Operator-controlled fields of an existing provider are
    /// overwritten by the seed.
    pub async fn upsert(&self, seed: &ProviderSeed) -> AppResult<Provider> {
        let now = Utc::now();
        let created_at = match self.store.get_provider(&seed.id).await {
            Ok(existing) => existing.created_at,
            Err(StoreError::NotFound(_)) => now,
            Err(e) => return Err(e.into()),
        };
        let provider = Provider {
            id: seed.id.clone(),
            service_type: seed.service_type,
            enabled: seed.enabled,
            priority: seed.priority,
            base_url: seed.base_url.clone(),
            health_path: seed.health_path.clone(),
            created_at,
            updated_at: now,
        };
        self.store.upsert_provider(&provider).await?;
        self.providers.insert(provider.id.clone(), provider.clone());

        info!(
            provider_id = %provider.id,
            service_type = %provider.service_type,
            priority = provider.priority,
            enabled = provider.enabled,
            "Provider registered"
        );
        Ok(provider)
    }

    /// Apply an operator update. Returns the provider unchanged when the
    /// update is a no-op.
    pub async fn update(&self, id: &str, update: &ProviderUpdate) -> AppResult<Provider> {
        let mut provider = self.get(id)?;
        if let Some(ref base_url) = update.base_url {
            if base_url.trim().is_empty() {
                return Err(AppError::InvalidInput("base_url must not be empty".to_string()));
            }
        }
        if !update.apply_to(&mut provider) {
            return Ok(provider);
        }
        provider.updated_at = Utc::now();
        self.store.upsert_provider(&provider).await?;
        self.providers.insert(provider.id.clone(), provider.clone());

        info!(
            provider_id = %provider.id,
            priority = provider.priority,
            enabled = provider.enabled,
            "Provider updated"
        );
        Ok(provider)
    }

    pub fn get(&self, id: &str) -> Result<Provider, RoutingError> {
        self.providers
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RoutingError::UnknownProvider { id: id.to_string() })
    }

    /// All providers, ordered by id.
    pub fn list(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> =
            self.providers.iter().map(|entry| entry.value().clone()).collect();
        providers.sort_by(|a, b| a.id.cmp(&b.id));
        providers
    }

    /// Providers of one service type, enabled and disabled.
    pub fn list_for(&self, service_type: ServiceType) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self
            .providers
            .iter()
            .filter(|entry| entry.value().service_type == service_type)
            .map(|entry| entry.value().clone())
            .collect();
        providers.sort_by(|a, b| a.id.cmp(&b.id));
        providers
    }

    pub fn enabled(&self) -> Vec<Provider> {
        self.list().into_iter().filter(|p| p.enabled).collect()
    }
}

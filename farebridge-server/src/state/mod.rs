//! Application State
//!
//! Holds the shared orchestrator and process-level bookkeeping for handlers
//! and schedulers.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use farebridge_core::{config, MemoryStore, Orchestrator, PostgresStore, ProviderStore};

use crate::cli::StoreArgs;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub orchestrator: Arc<Orchestrator>,
    /// Backend name reported by `/api/status`
    pub store_kind: &'static str,
    pub started_at: Instant,
    pub bound_port: AtomicU16,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, store_kind: &'static str) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                orchestrator,
                store_kind,
                started_at: Instant::now(),
                bound_port: AtomicU16::new(0),
            }),
        }
    }

    /// Load configuration, open the store and bootstrap the orchestrator.
    pub async fn initialize(args: &StoreArgs) -> Result<Self> {
        let config_path = match args.config {
            Some(ref path) => path.clone(),
            None => config::default_config_path().context("Failed to resolve config path")?,
        };
        let orchestrator_config = config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
        info!("Configuration loaded from {}", config_path.display());

        let (store, store_kind): (Arc<dyn ProviderStore>, &'static str) = match args.database_url {
            Some(ref url) => {
                let store = PostgresStore::connect(url).await.context("Failed to connect to PostgreSQL")?;
                store.run_migrations().await.context("Failed to run migrations")?;
                info!("PostgreSQL store ready");
                (Arc::new(store), "postgres")
            },
            None => {
                warn!("DATABASE_URL not set, state is in-memory and lost on restart");
                (Arc::new(MemoryStore::new()), "memory")
            },
        };

        let orchestrator = Orchestrator::with_http_probe(orchestrator_config, store)?;
        let providers = orchestrator.bootstrap().await?;
        info!("{} providers registered", providers);

        Ok(Self::new(Arc::new(orchestrator), store_kind))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    pub fn set_bound_port(&self, port: u16) {
        self.inner.bound_port.store(port, Ordering::Relaxed);
    }

    pub fn bound_port(&self) -> u16 {
        self.inner.bound_port.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}

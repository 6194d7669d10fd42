//! Farebridge Server - Headless Daemon
//!
//! Decides, per search request, which travel supplier to call first and
//! when to skip one entirely:
//! - REST API on /api/* for the search fan-out and operators
//! - Background health probing, quota window resets and retention cleanup
//! - One-shot CLI commands (status, reconcile, probe)
//!
//! Access via: http://localhost:8046

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod commands;
mod router;
mod scheduler;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands, StoreArgs};
use farebridge_core::ReconcileRequest;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        None => run_server(&cli.store, &cli.bind, cli.port).await,
        Some(Commands::Serve { port, bind }) => run_server(&cli.store, &bind, port).await,
        Some(Commands::Status { json }) => commands::handle_status(&cli.store, json).await,
        Some(Commands::Reconcile { providers, force_close, reset_estimated_quota, stale_after }) => {
            let request = ReconcileRequest {
                provider_ids: providers,
                force_close_circuits: force_close,
                reset_estimated_quota,
                stale_after_seconds: stale_after,
            };
            commands::handle_reconcile(&cli.store, request).await
        },
        Some(Commands::Probe { json }) => commands::handle_probe(&cli.store, json).await,
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_server(store: &StoreArgs, bind: &str, port: u16) -> Result<()> {
    info!("Farebridge Server v{} starting...", env!("CARGO_PKG_VERSION"));
    farebridge_core::prometheus::init_metrics();

    let state = AppState::initialize(store).await?;
    let tasks = scheduler::start_all(&state);

    let listener = server_utils::create_listener(bind, port).await?;
    let addr = listener.local_addr()?;
    state.set_bound_port(addr.port());
    info!("Server listening on http://{}", addr);
    info!("API available at http://{}/api/", addr);

    let app = router::build_router(state.clone());
    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    state.orchestrator().health_monitor().shutdown();
    for task in tasks {
        task.abort();
    }
    info!("Server stopped");
    Ok(())
}

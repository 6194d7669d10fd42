//! One-shot CLI subcommands. Each builds its own orchestrator against the
//! configured store and exits. In-memory state belongs to the serving
//! process, so these commands require `DATABASE_URL`.

use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use farebridge_core::{Orchestrator, ReconcileAction, ReconcileRequest};
use farebridge_types::models::{CircuitState, QuotaStatus, SystemHealthSnapshot};

use crate::cli::StoreArgs;
use crate::state::AppState;

/// Refuse to act on a throwaway in-memory store that the daemon never sees.
fn require_shared_store(args: &StoreArgs, command: &str) -> Result<()> {
    if args.database_url.is_none() {
        bail!(
            "`{command}` needs --database-url (or DATABASE_URL); without it the daemon's state is \
             in-memory and not reachable from this process"
        );
    }
    Ok(())
}

pub async fn handle_status(args: &StoreArgs, json: bool) -> Result<()> {
    require_shared_store(args, "status")?;
    let state = AppState::initialize(args).await?;
    let orchestrator = state.orchestrator();

    if json {
        let payload = serde_json::json!({
            "providers": orchestrator.providers(),
            "circuits": orchestrator.circuits().await?,
            "quotas": orchestrator.quotas().await?,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}", "Farebridge Status".cyan().bold());
    println!("  Store: {}", state.inner.store_kind);
    println!("  Version: {}", env!("CARGO_PKG_VERSION"));
    println!("{}", provider_table(orchestrator).await?);
    Ok(())
}

async fn provider_table(orchestrator: &Orchestrator) -> Result<Table> {
    let now = Utc::now();
    let circuits = orchestrator.circuits().await?;
    let quotas = orchestrator.quotas().await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Provider", "Service", "Priority", "Enabled", "Circuit", "Quota", "Limit"]);

    for provider in orchestrator.providers() {
        let circuit = circuits.iter().find(|c| c.provider_id == provider.id);
        let circuit_cell = match circuit {
            Some(c) if c.state == CircuitState::Open => {
                let remaining = c.cooldown_remaining_seconds(now).unwrap_or(0);
                Cell::new(format!("open ({remaining}s)")).fg(Color::Red)
            },
            Some(c) if c.state == CircuitState::HalfOpen => Cell::new("half_open").fg(Color::Yellow),
            Some(c) => Cell::new(format!("closed ({} failures)", c.failure_count)).fg(Color::Green),
            None => Cell::new("-"),
        };

        let quota = quotas.iter().find(|q| q.provider_id == provider.id);
        let (quota_cell, limit_cell) = match quota {
            Some(q) => {
                let status = orchestrator.quota_tracker().status_of(q);
                let color = match status {
                    QuotaStatus::Healthy => Color::Green,
                    QuotaStatus::Warning => Color::Yellow,
                    QuotaStatus::Critical | QuotaStatus::Exceeded => Color::Red,
                };
                let provenance = if q.is_actual_quota_limit { "" } else { " (est.)" };
                (
                    Cell::new(format!("{} {:.1}%", status.as_str(), q.percentage_used())).fg(color),
                    Cell::new(format!("{}/{}{}", q.quota_used, q.quota_limit, provenance)),
                )
            },
            None => (Cell::new("-"), Cell::new("-")),
        };

        table.add_row(vec![
            Cell::new(&provider.id),
            Cell::new(provider.service_type.as_str()),
            Cell::new(provider.priority),
            Cell::new(if provider.enabled { "yes" } else { "no" }),
            circuit_cell,
            quota_cell,
            limit_cell,
        ]);
    }
    Ok(table)
}

pub async fn handle_reconcile(args: &StoreArgs, request: ReconcileRequest) -> Result<()> {
    require_shared_store(args, "reconcile")?;
    let state = AppState::initialize(args).await?;
    let report = state.orchestrator().reconcile_provider_state(&request).await?;

    if report.is_noop() {
        println!(
            "{} {} providers checked, nothing to reconcile",
            "✓".green(),
            report.providers_checked
        );
        return Ok(());
    }

    for action in &report.actions {
        let line = match action {
            ReconcileAction::CircuitClosed { provider_id, previous, forced } => {
                let why = if *forced { "forced" } else { "stale" };
                format!("{provider_id}: circuit {previous} -> closed ({why})")
            },
            ReconcileAction::TrialLeaseReleased { provider_id } => {
                format!("{provider_id}: abandoned half-open trial released")
            },
            ReconcileAction::QuotaWindowReset { provider_id } => {
                format!("{provider_id}: elapsed quota window reset")
            },
            ReconcileAction::EstimatedQuotaReset { provider_id, previous_used } => {
                format!("{provider_id}: estimated quota counter reset (was {previous_used})")
            },
        };
        println!("{} {}", "✓".green(), line);
    }
    Ok(())
}

pub async fn handle_probe(args: &StoreArgs, json: bool) -> Result<()> {
    require_shared_store(args, "probe")?;
    let state = AppState::initialize(args).await?;
    let snapshot = state.orchestrator().run_health_cycle().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &SystemHealthSnapshot) {
    let headline = if snapshot.overall_healthy() {
        "Healthy".green().bold()
    } else {
        "No provider available".red().bold()
    };
    println!("{} {}", "System health:".cyan().bold(), headline);
    println!(
        "  Providers: {} total, {} available",
        snapshot.total_providers, snapshot.available_providers
    );
    println!(
        "  Probes: {} healthy, {} degraded, {} outage, {} unprobed",
        snapshot.healthy, snapshot.degraded, snapshot.outage, snapshot.unprobed
    );
    for (label, ids) in [
        ("Open circuits", &snapshot.open_circuits),
        ("Half-open circuits", &snapshot.half_open_circuits),
        ("Critical quota", &snapshot.critical_quota),
        ("Exceeded quota", &snapshot.exceeded_quota),
        ("Estimated limits", &snapshot.estimated_quota),
    ] {
        if !ids.is_empty() {
            println!("  {}: {}", label, ids.join(", "));
        }
    }
}

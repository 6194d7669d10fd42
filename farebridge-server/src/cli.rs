use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "farebridge",
    about = "Farebridge Server - provider failover and quota-aware routing",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(short, long, env = "FAREBRIDGE_PORT", default_value = "8046")]
    pub port: u16,

    #[arg(short, long, env = "FAREBRIDGE_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

/// Where state and configuration come from. Shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    #[arg(
        long,
        env = "DATABASE_URL",
        global = true,
        help = "PostgreSQL connection string; in-memory state when absent (serve only)"
    )]
    pub database_url: Option<String>,

    #[arg(
        short,
        long,
        env = "FAREBRIDGE_CONFIG",
        global = true,
        help = "Path to the JSON configuration file"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the API server and schedulers (default if no command specified)")]
    Serve {
        #[arg(short, long, env = "FAREBRIDGE_PORT", default_value = "8046")]
        port: u16,

        #[arg(short, long, env = "FAREBRIDGE_BIND", default_value = "127.0.0.1")]
        bind: String,
    },

    #[command(about = "Show providers with circuit and quota state")]
    Status {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Reset stale provider state (idempotent)")]
    Reconcile {
        #[arg(long = "provider", help = "Provider id to reconcile (repeatable; default all)")]
        providers: Vec<String>,

        #[arg(long, help = "Close every non-closed circuit regardless of age")]
        force_close: bool,

        #[arg(long, help = "Zero usage counters whose limit is an estimate")]
        reset_estimated_quota: bool,

        #[arg(long, help = "Seconds after which a non-closed circuit counts as stale")]
        stale_after: Option<i64>,
    },

    #[command(about = "Run one health probe cycle and print the snapshot")]
    Probe {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },
}

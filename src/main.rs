//! # Chime: reactive chat automations
//!
//! Loads the config, opens the SQLite store, replays the registry, starts the
//! job timer and serves the admin API until Ctrl-C.
//!
//! Usage:
//!   chime                          # ~/.chime/config.toml, port 8610
//!   chime --config ./chime.toml    # explicit config file
//!   chime --port 9000 --verbose    # override port, debug logging

use anyhow::Result;
use chime_core::config::ChimeConfig;
use chime_core::transport::LogTransport;
use chime_registry::Runtime;
use chime_store::SqliteStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chime", version, about = "🔔 Chime: rules, notice triggers and scheduled jobs")]
struct Cli {
    /// Config file (default: ~/.chime/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admin API port, overrides the config
    #[arg(short, long)]
    port: Option<u16>,

    /// Store directory, overrides the config
    #[arg(long)]
    data_dir: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool, format: &str) {
    let filter = if verbose {
        "chime=debug,chime_core=debug,chime_store=debug,chime_rules=debug,chime_scheduler=debug,chime_registry=debug,chime_gateway=debug,tower_http=debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ChimeConfig::load_from(path)?,
        None => ChimeConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    init_logging(cli.verbose, &config.log_format);
    tracing::info!("🔔 Chime v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.data_path().join("chime.db");
    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!("💾 Store: {}", db_path.display());

    let runtime = Runtime::builder(store, Arc::new(LogTransport))
        .config(&config)
        .build()?;

    let timer = if config.scheduler.enabled {
        Some(runtime.spawn_scheduler(config.scheduler.tick_secs))
    } else {
        tracing::info!("⏸️ Job timer disabled by config");
        None
    };

    chime_gateway::start(&config.gateway, runtime, shutdown_signal()).await?;

    if let Some(handle) = timer {
        handle.abort();
    }
    Ok(())
}

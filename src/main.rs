//! stock-sync - decrements Shopify stock from a daily sales sheet
//!
//! Module structure:
//! - `domain/` - Core types (SaleRow, Variant, InventoryLevel, results)
//! - `io/` - External interfaces (sales sheet, Shopify client, upload gateway)
//! - `services/` - Sync logic (InventoryReconciler, sync runs)
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stock_sync::infra::{Config, Metrics};
use stock_sync::io::{GatewayState, ShopifyClient};
use stock_sync::services::{run_sync, ABORTED_MESSAGE};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// stock-sync - apply daily sales to store inventory
#[derive(Parser, Debug)]
#[command(name = "stock-sync", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload page (default)
    Serve,
    /// Apply a single sales sheet from disk and print the result
    Apply {
        /// Path to the sales sheet (.xlsx or CSV)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, level via RUST_LOG (default: info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        store_host = %config.store_host(),
        api_version = %config.store_api_version(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        skip_rows = %config.sheet_layout().skip_rows,
        "config_loaded"
    );

    // Missing credential is fatal at startup, never per run
    let client = Arc::new(ShopifyClient::new(&config)?);
    let metrics = Arc::new(Metrics::new());

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, client, metrics).await,
        Command::Apply { file } => apply(&config, &client, &metrics, &file).await,
    }
}

async fn serve(
    config: &Config,
    client: Arc<ShopifyClient>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let state =
        Arc::new(GatewayState::new(client, config.sheet_layout().clone(), metrics.clone()));
    stock_sync::io::start_upload_server(config.bind_address(), config.port(), state, shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("upload server failed")?;

    metrics.snapshot().log();
    info!("stock-sync shutdown complete");
    Ok(())
}

async fn apply(
    config: &Config,
    client: &ShopifyClient,
    metrics: &Metrics,
    file: &Path,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read sales sheet {}", file.display()))?;

    match run_sync(client, &bytes, config.sheet_layout(), metrics).await {
        Ok(report) => {
            println!("{report}");
            for rejected in &report.rejected {
                println!("  {rejected}");
            }
            Ok(())
        }
        Err(e) => {
            println!("{ABORTED_MESSAGE}");
            Err(e).context("sync run aborted")
        }
    }
}

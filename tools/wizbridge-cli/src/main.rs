//! `wizbridge` - Art-Net to WiZ smart-bulb bridge CLI
//!
//! Starts the bridge engine in the foreground (`run`), runs a one-shot
//! bulb discovery scan (`discover`), or runs the bridge under the
//! restart-with-backoff supervisor (`supervise`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wizbridge_bridge::{BulbStore, Engine, HttpBulbStore, StaticBulbStore};
use wizbridge_core::BulbRecord;
use wizbridge_supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "wizbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON instead of the compact text format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge engine in the foreground
    Run {
        /// Bulb record store HTTP base URL, e.g. http://localhost:8080/api
        #[arg(long, conflicts_with = "bulbs_file")]
        store_url: Option<String>,

        /// A static JSON bulb-list file to use instead of polling an
        /// HTTP store (array of {mac, ip, name, type, channel})
        #[arg(long, conflicts_with = "store_url")]
        bulbs_file: Option<PathBuf>,

        /// Address to bind the Art-Net UDP listener on
        #[arg(long, default_value = "0.0.0.0:6454")]
        artnet_bind: String,
    },

    /// Broadcast a discovery scan and print responding bulbs as JSON
    Discover {
        /// How long to wait for replies, in milliseconds
        #[arg(long, default_value_t = 3000)]
        timeout_ms: u64,
    },

    /// Run the bridge under the restart-with-backoff supervisor
    Supervise {
        /// Bulb record store HTTP base URL, forwarded to the
        /// supervised `run` invocation
        #[arg(long, conflicts_with = "bulbs_file")]
        store_url: Option<String>,

        /// A static JSON bulb-list file, forwarded to the supervised
        /// `run` invocation
        #[arg(long, conflicts_with = "store_url")]
        bulbs_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Run {
            store_url,
            bulbs_file,
            artnet_bind,
        } => run_bridge(store_url, bulbs_file, artnet_bind).await,

        Commands::Discover { timeout_ms } => run_discover(timeout_ms).await,

        Commands::Supervise {
            store_url,
            bulbs_file,
        } => run_supervised(store_url, bulbs_file).await,
    }
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

fn build_store(
    store_url: Option<String>,
    bulbs_file: Option<PathBuf>,
) -> Result<Arc<dyn BulbStore>> {
    if let Some(url) = store_url {
        return Ok(Arc::new(HttpBulbStore::new(url)));
    }
    if let Some(path) = bulbs_file {
        let body = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read bulb list {}", path.display()))?;
        let records: Vec<BulbRecord> = serde_json::from_str(&body)
            .with_context(|| format!("failed to parse bulb list {}", path.display()))?;
        return Ok(Arc::new(StaticBulbStore::new(records)));
    }
    anyhow::bail!("either --store-url or --bulbs-file is required")
}

async fn run_bridge(
    store_url: Option<String>,
    bulbs_file: Option<PathBuf>,
    artnet_bind: String,
) -> Result<()> {
    let store = build_store(store_url, bulbs_file)?;
    let engine = Arc::new(
        Engine::bind(store, artnet_bind)
            .await
            .context("failed to bind bridge sockets")?,
    );

    info!("wizbridge running, press ctrl-c to stop");
    tokio::select! {
        result = engine.run() => {
            result.context("bridge engine exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, exiting");
        }
    }

    Ok(())
}

async fn run_discover(timeout_ms: u64) -> Result<()> {
    let bulbs = wizbridge_discovery::discover(Duration::from_millis(timeout_ms))
        .await
        .context("discovery scan failed")?;
    println!("{}", serde_json::to_string_pretty(&bulbs)?);
    Ok(())
}

async fn run_supervised(store_url: Option<String>, bulbs_file: Option<PathBuf>) -> Result<()> {
    let exe = std::env::current_exe().context("failed to resolve current executable")?;
    let mut args = vec!["run".to_string()];
    if let Some(url) = store_url {
        args.push("--store-url".to_string());
        args.push(url);
    }
    if let Some(path) = bulbs_file {
        args.push("--bulbs-file".to_string());
        args.push(path.display().to_string());
    }

    let supervisor = Supervisor::new(exe.display().to_string(), args);
    supervisor.start().context("failed to start supervisor")?;

    info!("supervising wizbridge, press ctrl-c to stop");
    tokio::signal::ctrl_c().await.ok();
    warn!("shutting down supervisor");
    supervisor.stop().await;

    Ok(())
}

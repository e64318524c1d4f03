//! Cart tracker CLI.
//!
//! Replays a recorded detection stream through the reconciler, syncing
//! confirmed changes to the ledger, and prints the final inventory summary as
//! JSON.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Subscriber, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use carttrack_rs::integration::{ReplayDetector, ReplaySource};
use carttrack_rs::{
    AppConfig, FrameDriver, InventoryReconciler, Ledger, LedgerClient, SkuCatalog, SyncJob,
    SyncWorker,
};
use carttrack_rs::sync::DivergenceHandler;

/// CLI arguments; flags override values from the config file.
#[derive(Parser, Debug)]
#[command(
    name = "carttrack",
    about = "Reconcile cart camera detections into an inventory synced to the ledger",
    version
)]
struct CliArgs {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Recorded detection stream (JSON lines) to replay.
    #[arg(long, value_name = "FILE")]
    replay: PathBuf,

    #[arg(long, value_name = "ID")]
    cart_id: Option<String>,

    /// Ledger base URL.
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// JSON SKU map.
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Minimum detection confidence.
    #[arg(long, value_name = "SCORE")]
    confidence: Option<f32>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Also write logs to `<log_dir>/cart_<cart_id>.log`.
    #[arg(long)]
    log_to_file: bool,

    /// Do not check the ledger before starting.
    #[arg(long)]
    skip_health_check: bool,
}

impl CliArgs {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(cart_id) = &self.cart_id {
            config.cart_id = cart_id.clone();
        }
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(path) = &self.catalog {
            config.catalog_path = path.clone();
        }
        if let Some(confidence) = self.confidence {
            config.tracker.confidence_threshold = confidence;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.log_to_file {
            config.log_to_file = true;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Console logging, plus an append-only per-cart log file when configured.
fn subscriber(
    default_level: &str,
    log_file: Option<File>,
) -> impl Subscriber + Send + Sync + use<> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer =
        log_file.map(|file| fmt::layer().with_ansi(false).with_writer(Arc::new(file)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
}

fn open_log_file(config: &AppConfig) -> Result<Option<File>> {
    if !config.log_to_file {
        return Ok(None);
    }
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log directory {}", config.log_dir.display()))?;
    let path = config.log_file_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    Ok(Some(file))
}

fn init_tracing(config: &AppConfig) -> Result<()> {
    let log_file = open_log_file(config)?;
    // A second subscriber only matters in tests; ignore it.
    let _ = subscriber(&config.log_level, log_file).try_init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = args.load_config()?;
    init_tracing(&config)?;

    let catalog = SkuCatalog::from_file(&config.catalog_path)
        .with_context(|| format!("loading SKU map {}", config.catalog_path.display()))?;
    info!(skus = catalog.len(), path = %config.catalog_path.display(), "loaded SKU map");

    let mut source = ReplaySource::from_file(&args.replay)
        .with_context(|| format!("loading recording {}", args.replay.display()))?;
    info!(frames = source.len(), "loaded recording");

    let client = LedgerClient::new(config.backend_url.as_str(), &config.sync)?;
    if !args.skip_health_check {
        if client.health_check().await {
            info!(url = %client.base_url(), "ledger reachable");
        } else {
            warn!(url = %client.base_url(), "ledger is not reachable, ledger calls will fail");
        }
    }
    let sync_stats = client.stats();
    let client_for_resync = client.clone();

    let (worker, handle) = SyncWorker::new(client, Vec::<SyncJob>::new());
    let worker_task = worker.spawn();

    let reconciler =
        InventoryReconciler::new(config.cart_id.clone(), config.tracker.clone(), catalog, handle);
    let mut driver = FrameDriver::new(ReplayDetector, reconciler);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("stopping at next frame boundary");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let (mut driver, run_result) = tokio::task::spawn_blocking(move || {
        let result = driver.run(&mut source, &stop);
        (driver, result)
    })
    .await
    .context("frame loop panicked")?;
    let driver_stats = run_result?;

    let summary = driver.reconciler().inventory_summary();
    let orphaned = driver.reconciler_mut().sync_sink_mut().take_orphaned();
    // Dropping the driver drops the last sync handle; the worker drains its queue.
    drop(driver);
    let mut outcome = worker_task.await.context("sync worker panicked")?;
    for job in orphaned {
        outcome.divergence.on_divergence(job);
    }

    info!(
        frames_read = driver_stats.frames_read,
        frames_processed = driver_stats.frames_processed,
        confirmed = driver_stats.confirmed,
        evicted = driver_stats.evicted,
        delivered = outcome.delivered,
        failed = outcome.failed,
        http_attempts = sync_stats.attempts(),
        "run complete"
    );
    if !outcome.divergence.is_empty() {
        warn!(
            pending = outcome.divergence.len(),
            "ledger may disagree with local inventory until resynced"
        );
        if let Some(remote) = client_for_resync.fetch_summary(&config.cart_id).await {
            warn!(
                local_items = summary.item_count,
                ledger_items = remote.item_count,
                "ledger cart summary after divergence"
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

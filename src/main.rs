//! Snapshot Ingest - Entry Point
//!
//! Initializes configuration, logging, the ledger client, and the
//! checkpointed snapshot poller. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load ledger auth from env vars (LEDGER_CLIENT_ID, LEDGER_SESSION_ID, LEDGER_SESSION_SECRET)
//! 4. Create LedgerClient (HTTP + auth + retry) and the snapshot source
//! 5. Open the file repository (checkpoint, orders, refunds)
//! 6. Resume the poller from the persisted checkpoint
//! 7. Spawn health (/live + /ready) and Prometheus servers
//! 8. Spawn the poller
//! 9. Wait for SIGINT → broadcast shutdown → wait for the poller

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use snapshot_ingest::adapters::api::{
  LedgerAuth, LedgerClient, LedgerClientConfig, LedgerSnapshotSource,
};
use snapshot_ingest::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use snapshot_ingest::adapters::persistence::FileRepository;
use snapshot_ingest::config;
use snapshot_ingest::domain::intent::IntentResolver;
use snapshot_ingest::usecases::{SnapshotPoller, SnapshotProcessor};

#[tokio::main]
async fn main() -> Result<()> {
  // ── 1. Load configuration from config.toml ──────────────
  let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
  let config = config::loader::load_config(&config_path)
    .context("Failed to load configuration")?;

  // ── 2. Initialize structured JSON logging ───────────────
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.exchange.log_level)),
    )
    .json()
    .init();

  info!(
    name = %config.exchange.name,
    version = env!("CARGO_PKG_VERSION"),
    account_id = %config.exchange.account_id,
    primary_asset = %config.pairs.primary_asset,
    stable_asset = %config.pairs.stable_asset,
    "Starting snapshot ingest"
  );

  // ── 3. Shutdown signal channel ──────────────────────────
  let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

  // ── 4. Ledger auth + client + snapshot source ───────────
  let auth = Arc::new(
    LedgerAuth::from_env().context("Failed to load ledger credentials from env")?,
  );
  info!(client_id = %auth.client_id(), "Ledger credentials loaded");

  let ledger_client = Arc::new(
    LedgerClient::new(Arc::clone(&auth), LedgerClientConfig::from(&config.ledger))
      .context("Failed to create ledger client")?,
  );
  let source = Arc::new(LedgerSnapshotSource::new(Arc::clone(&ledger_client)));

  // ── 5. File repository (checkpoint + orders + refunds) ──
  let repository = Arc::new(
    FileRepository::from_data_dir(&config.persistence.data_dir)
      .await
      .context("Failed to open data directory")?,
  );

  // ── 6. Resume poller from the persisted checkpoint ──────
  let processor = SnapshotProcessor::new(
    config.exchange.account_id.clone(),
    IntentResolver::new(config.pairs.policy()),
    Arc::clone(&repository),
    Arc::clone(&repository),
  );

  let health = Arc::new(HealthState::new());
  let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

  let poller = SnapshotPoller::resume(
    source,
    Arc::clone(&repository),
    processor,
    config.ledger.poller(),
    config.persistence.initial_checkpoint,
  )
  .await
  .context("Failed to restore checkpoint")?
  .with_metrics(Arc::clone(&metrics))
  .with_health(Arc::clone(&health));

  info!(checkpoint = %poller.checkpoint(), "Checkpoint restored");

  // ── 7. Health + metrics servers ─────────────────────────
  let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
  let health_shutdown = shutdown_tx.subscribe();
  let health_handle = tokio::spawn(async move {
    if let Err(e) = health_server.run(health_shutdown).await {
      error!(error = %e, "Health server failed");
    }
  });

  let metrics_handle = if config.metrics.enabled {
    let metrics_shutdown = shutdown_tx.subscribe();
    let bind_address = config.metrics.bind_address.clone();
    Some(tokio::spawn(async move {
      if let Err(e) = metrics.serve(bind_address, metrics_shutdown).await {
        error!(error = %e, "Metrics server failed");
      }
    }))
  } else {
    None
  };

  // ── 8. Spawn the snapshot poller ────────────────────────
  let poller_shutdown = shutdown_tx.subscribe();
  let poller_handle = tokio::spawn(poller.run(poller_shutdown));

  info!("All tasks spawned - ingest is running");

  // ── 9. Wait for SIGINT ──────────────────────────────────
  signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
  info!("SIGINT received, initiating graceful shutdown");

  let _ = shutdown_tx.send(());

  match tokio::time::timeout(Duration::from_secs(30), poller_handle).await {
    Ok(Ok(checkpoint)) => info!(checkpoint = %checkpoint, "Poller stopped"),
    Ok(Err(e)) => error!(error = %e, "Poller task panicked"),
    Err(_) => warn!("Poller did not stop within 30s"),
  }

  let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
  if let Some(handle) = metrics_handle {
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
  }

  info!("Shutdown complete");
  Ok(())
}

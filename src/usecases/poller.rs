//! Snapshot Poller - Checkpointed At-Least-Once Ingestion Loop
//!
//! Drains the ledger's snapshot stream in creation order:
//! 1. Fetch a page of snapshots created after the checkpoint
//! 2. Process each snapshot in order through the pipeline
//! 3. Advance (and persist) the checkpoint after each success
//! 4. On the first failure, stop the page and refetch from the
//!    checkpoint after a fixed backoff
//! 5. When a page comes back short, the feed is drained: idle briefly
//!
//! A single sequential worker owns the checkpoint; there is no
//! reordering or parallelism across snapshots. Shutdown is honoured
//! between fetches, between snapshots, and during sleeps. A snapshot in
//! flight always finishes (effects and checkpoint) first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::ports::ledger::SnapshotSource;
use crate::ports::refund::RefundHandler;
use crate::ports::repository::{CheckpointStore, OrderRepository};

use super::pipeline::{PipelineError, SnapshotProcessor};

/// Poll loop tuning.
#[derive(Debug, Clone)]
pub struct PollerConfig {
  /// Snapshots requested per page (server caps at 500).
  pub page_limit: usize,
  /// Backoff after a fetch or processing failure.
  pub retry_delay: Duration,
  /// Pause after a short page (feed drained).
  pub idle_delay: Duration,
}

impl Default for PollerConfig {
  fn default() -> Self {
    Self {
      page_limit: 500,
      retry_delay: Duration::from_secs(1),
      idle_delay: Duration::from_secs(1),
    }
  }
}

/// Result of one fetch-and-process pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassResult {
  /// The page fetch failed; nothing was processed.
  FetchFailed,
  /// A page was fetched and processed in order until done or a failure.
  Page {
    /// Snapshots in the page.
    fetched: usize,
    /// Snapshots fully processed (checkpoint advanced past them).
    processed: usize,
    /// Whether processing stopped on a failure.
    failed: bool,
  },
  /// Shutdown was observed.
  Stopped {
    /// Snapshots fully processed before stopping.
    processed: usize,
  },
}

/// Sequential, checkpointed snapshot consumer.
pub struct SnapshotPoller<S, C, O, R>
where
  S: SnapshotSource,
  C: CheckpointStore,
  O: OrderRepository,
  R: RefundHandler,
{
  /// Ledger snapshot source.
  source: Arc<S>,
  /// Durable checkpoint store.
  checkpoints: Arc<C>,
  /// Per-snapshot pipeline.
  processor: SnapshotProcessor<O, R>,
  /// Loop tuning.
  config: PollerConfig,
  /// Creation time of the last fully processed snapshot.
  checkpoint: DateTime<Utc>,
  /// Optional metrics sink.
  metrics: Option<Arc<MetricsRegistry>>,
  /// Optional readiness state.
  health: Option<Arc<HealthState>>,
}

impl<S, C, O, R> SnapshotPoller<S, C, O, R>
where
  S: SnapshotSource,
  C: CheckpointStore,
  O: OrderRepository,
  R: RefundHandler,
{
  /// Create a poller starting at `checkpoint`.
  pub fn new(
    source: Arc<S>,
    checkpoints: Arc<C>,
    processor: SnapshotProcessor<O, R>,
    config: PollerConfig,
    checkpoint: DateTime<Utc>,
  ) -> Self {
    Self {
      source,
      checkpoints,
      processor,
      config,
      checkpoint,
      metrics: None,
      health: None,
    }
  }

  /// Create a poller resuming from the persisted checkpoint, or from
  /// `fallback` on first start.
  ///
  /// # Errors
  /// Fails if the checkpoint store cannot be read. This is fatal at
  /// startup.
  pub async fn resume(
    source: Arc<S>,
    checkpoints: Arc<C>,
    processor: SnapshotProcessor<O, R>,
    config: PollerConfig,
    fallback: DateTime<Utc>,
  ) -> Result<Self> {
    let checkpoint = checkpoints
      .load_checkpoint()
      .await
      .context("Failed to read initial checkpoint")?
      .unwrap_or(fallback);
    Ok(Self::new(source, checkpoints, processor, config, checkpoint))
  }

  /// Attach a metrics registry.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    metrics.record_checkpoint(self.checkpoint);
    self.metrics = Some(metrics);
    self
  }

  /// Attach the shared health state.
  #[must_use]
  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  /// Creation time of the last fully processed snapshot.
  pub fn checkpoint(&self) -> DateTime<Utc> {
    self.checkpoint
  }

  /// Run until shutdown. Returns the final checkpoint.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> DateTime<Utc> {
    info!(
      checkpoint = %self.checkpoint,
      page_limit = self.config.page_limit,
      "Snapshot poller started"
    );
    if let Some(health) = &self.health {
      health.set_poller_running(true);
    }

    loop {
      let delay = match self.poll_once(&mut shutdown_rx).await {
        PassResult::Stopped { .. } => break,
        PassResult::FetchFailed | PassResult::Page { failed: true, .. } => {
          Some(self.config.retry_delay)
        }
        PassResult::Page { fetched, .. } if fetched < self.config.page_limit => {
          Some(self.config.idle_delay)
        }
        PassResult::Page { .. } => None,
      };

      match delay {
        Some(delay) => {
          tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            () = sleep(delay) => {}
          }
        }
        None => {
          if shutdown_requested(&mut shutdown_rx) {
            break;
          }
        }
      }
    }

    if let Some(health) = &self.health {
      health.set_poller_running(false);
    }
    info!(checkpoint = %self.checkpoint, "Snapshot poller stopped");
    self.checkpoint
  }

  /// Fetch one page after the checkpoint and process it in order.
  pub async fn poll_once(&mut self, shutdown_rx: &mut broadcast::Receiver<()>) -> PassResult {
    let started = Instant::now();
    let fetched = tokio::select! {
      biased;
      _ = shutdown_rx.recv() => return PassResult::Stopped { processed: 0 },
      result = self.source.fetch_after(self.checkpoint, self.config.page_limit) => result,
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let snapshots = match fetched {
      Ok(snapshots) => {
        self.observe_fetch("ok", elapsed_ms);
        snapshots
      }
      Err(e) => {
        warn!(
          error = %format!("{e:#}"),
          checkpoint = %self.checkpoint,
          "Snapshot fetch failed, retrying"
        );
        self.observe_fetch("error", elapsed_ms);
        return PassResult::FetchFailed;
      }
    };

    let fetched = snapshots.len();
    let mut processed = 0;
    debug!(fetched, checkpoint = %self.checkpoint, "Snapshot page fetched");

    for snapshot in &snapshots {
      if shutdown_requested(shutdown_rx) {
        return PassResult::Stopped { processed };
      }

      let result = match self.processor.process(snapshot).await {
        Ok(outcome) => self.advance(snapshot.created_at).await.map(|()| outcome),
        Err(e) => Err(e),
      };

      match result {
        Ok(outcome) => {
          if let Some(metrics) = &self.metrics {
            metrics.record_outcome(&outcome);
          }
          processed += 1;
        }
        Err(e) => {
          warn!(
            error = %e,
            snapshot_id = %snapshot.snapshot_id,
            checkpoint = %self.checkpoint,
            "Snapshot processing failed, holding checkpoint"
          );
          if let Some(metrics) = &self.metrics {
            metrics.processing_failures.inc();
          }
          return PassResult::Page {
            fetched,
            processed,
            failed: true,
          };
        }
      }
    }

    PassResult::Page {
      fetched,
      processed,
      failed: false,
    }
  }

  /// Move the checkpoint forward to `created_at`, persisting it first.
  /// Never moves backwards.
  async fn advance(&mut self, created_at: DateTime<Utc>) -> Result<(), PipelineError> {
    if created_at <= self.checkpoint {
      return Ok(());
    }
    self
      .checkpoints
      .save_checkpoint(created_at)
      .await
      .map_err(|cause| PipelineError::Checkpoint { cause })?;
    self.checkpoint = created_at;
    if let Some(metrics) = &self.metrics {
      metrics.record_checkpoint(created_at);
    }
    Ok(())
  }

  fn observe_fetch(&self, result: &str, elapsed_ms: f64) {
    if let Some(health) = &self.health {
      health.set_ledger_reachable(result == "ok");
    }
    if let Some(metrics) = &self.metrics {
      metrics
        .fetch_latency_ms
        .with_label_values(&[result])
        .observe(elapsed_ms);
      if result != "ok" {
        metrics.fetch_failures.inc();
      }
    }
  }
}

/// Non-blocking shutdown check. A closed or lagged channel counts as a
/// shutdown request.
fn shutdown_requested(shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
  !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
}

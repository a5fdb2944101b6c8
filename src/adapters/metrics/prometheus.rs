//! Prometheus Metrics Registry - Ingestion Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers snapshot outcomes, refund reasons, fetch health, and the
//! checkpoint position.

use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::usecases::pipeline::Outcome;

/// Centralized Prometheus metrics for the ingest service.
///
/// All metrics follow the naming convention `snapshot_ingest_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Snapshots fully processed, by outcome.
    pub snapshots_processed: IntCounterVec,
    /// Snapshots skipped by a guard, by reason.
    pub snapshots_ignored: IntCounterVec,
    /// Refunds owed, by reason.
    pub refunds: IntCounterVec,
    /// Snapshots whose processing failed (retried later).
    pub processing_failures: IntCounter,
    /// Failed page fetches.
    pub fetch_failures: IntCounter,
    /// Page fetch latency in milliseconds.
    pub fetch_latency_ms: HistogramVec,
    /// Current checkpoint as Unix seconds.
    pub checkpoint_unix: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let snapshots_processed = IntCounterVec::new(
            Opts::new(
                "snapshot_ingest_snapshots_processed_total",
                "Snapshots fully processed",
            ),
            &["outcome"],
        )?;

        let snapshots_ignored = IntCounterVec::new(
            Opts::new(
                "snapshot_ingest_snapshots_ignored_total",
                "Snapshots skipped by guard filters",
            ),
            &["reason"],
        )?;

        let refunds = IntCounterVec::new(
            Opts::new("snapshot_ingest_refunds_total", "Refunds owed to senders"),
            &["reason"],
        )?;

        let processing_failures = IntCounter::new(
            "snapshot_ingest_processing_failures_total",
            "Snapshots whose processing failed and will be redelivered",
        )?;

        let fetch_failures = IntCounter::new(
            "snapshot_ingest_fetch_failures_total",
            "Failed snapshot page fetches",
        )?;

        let fetch_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "snapshot_ingest_fetch_latency_ms",
                "Snapshot page fetch latency in milliseconds",
            )
            .buckets(vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]),
            &["result"],
        )?;

        let checkpoint_unix = IntGauge::new(
            "snapshot_ingest_checkpoint_unix_seconds",
            "Creation time of the last fully processed snapshot",
        )?;

        // Register all metrics
        registry.register(Box::new(snapshots_processed.clone()))?;
        registry.register(Box::new(snapshots_ignored.clone()))?;
        registry.register(Box::new(refunds.clone()))?;
        registry.register(Box::new(processing_failures.clone()))?;
        registry.register(Box::new(fetch_failures.clone()))?;
        registry.register(Box::new(fetch_latency_ms.clone()))?;
        registry.register(Box::new(checkpoint_unix.clone()))?;

        Ok(Self {
            registry,
            snapshots_processed,
            snapshots_ignored,
            refunds,
            processing_failures,
            fetch_failures,
            fetch_latency_ms,
            checkpoint_unix,
        })
    }

    /// Count one processed snapshot.
    pub fn record_outcome(&self, outcome: &Outcome) {
        self.snapshots_processed
            .with_label_values(&[outcome.label()])
            .inc();
        match outcome {
            Outcome::Ignored(reason) => self
                .snapshots_ignored
                .with_label_values(&[reason.as_str()])
                .inc(),
            Outcome::Refunded(reason) => {
                self.refunds.with_label_values(&[reason.as_str()]).inc();
            }
            Outcome::Created(_) | Outcome::Cancelled(_) => {}
        }
    }

    /// Publish the checkpoint position.
    pub fn record_checkpoint(&self, checkpoint: DateTime<Utc>) {
        self.checkpoint_unix.set(checkpoint.timestamp());
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not UTF-8")
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

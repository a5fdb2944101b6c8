//! Ledger Snapshot Source - Adapter for the Snapshot Stream
//!
//! Implements the `SnapshotSource` port over the shared `LedgerClient`.
//! Pages are requested in ascending creation order starting at the
//! checkpoint offset.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument};

use super::client::LedgerClient;
use super::types::SnapshotEnvelope;
use crate::domain::snapshot::Snapshot;
use crate::ports::ledger::SnapshotSource;

/// Request path for one page of network snapshots after `checkpoint`.
pub fn snapshots_path(checkpoint: DateTime<Utc>, limit: usize) -> String {
    format!(
        "/network/snapshots?offset={}&order=ASC&limit={limit}",
        checkpoint.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

/// Snapshot source backed by the signed ledger client.
pub struct LedgerSnapshotSource {
    /// Shared ledger client.
    client: Arc<LedgerClient>,
}

impl LedgerSnapshotSource {
    /// Create a new snapshot source.
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotSource for LedgerSnapshotSource {
    #[instrument(skip(self), fields(checkpoint = %checkpoint))]
    async fn fetch_after(&self, checkpoint: DateTime<Utc>, limit: usize) -> Result<Vec<Snapshot>> {
        let path = snapshots_path(checkpoint, limit);
        let response = self
            .client
            .get(&path)
            .await
            .context("Failed to fetch snapshots")?;

        let envelope: SnapshotEnvelope = response
            .json()
            .await
            .context("Failed to parse snapshot page")?;

        if let Some(error) = envelope.error_message() {
            bail!("Ledger API error: {error}");
        }

        let snapshots: Vec<Snapshot> = envelope
            .data
            .into_iter()
            .map(super::types::SnapshotPayload::into_snapshot)
            .collect();

        debug!(count = snapshots.len(), "Snapshot page received");
        Ok(snapshots)
    }
}

//! Ledger Port - Snapshot Stream Interface
//!
//! Defines the trait for reading asset-transfer snapshots from the
//! ledger network. The network serves snapshots in ascending creation
//! order behind an offset cursor with a server-side page size cap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::snapshot::Snapshot;

/// Trait for snapshot providers.
///
/// Implementors handle transport, authentication, and envelope parsing.
/// Any failure (network, auth, malformed envelope, API error) is
/// reported as an error; the poller treats them all as transient.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
  /// Fetch up to `limit` snapshots created strictly after `checkpoint`,
  /// ordered by creation time ascending.
  async fn fetch_after(
    &self,
    checkpoint: DateTime<Utc>,
    limit: usize,
  ) -> anyhow::Result<Vec<Snapshot>>;
}

//! Refund Port - Compensating Transfers
//!
//! The pipeline only decides that a deposit must go back to its
//! sender. Executing the transfer belongs to the implementor.

use async_trait::async_trait;

use crate::domain::intent::RefundReason;
use crate::domain::snapshot::Snapshot;

/// Receives refund obligations.
#[async_trait]
pub trait RefundHandler: Send + Sync + 'static {
  /// Record that `snapshot` must be returned to its sender.
  ///
  /// Must tolerate redelivery of the same snapshot.
  async fn refund(&self, snapshot: &Snapshot, reason: RefundReason) -> anyhow::Result<()>;
}

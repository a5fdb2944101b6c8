//! Repository Port - Checkpoint and Order Persistence Interface
//!
//! Defines the traits the pipeline uses to persist its cursor and to
//! hand resolved orders to the trading engine's store. Every write is
//! expected to be idempotent: the poller redelivers a snapshot whenever
//! its processing fails part way.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::intent::OrderIntent;
use crate::domain::snapshot::OrderId;

/// Durable store for the ingestion checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync + 'static {
  /// Read the last persisted checkpoint, `None` on first start.
  async fn load_checkpoint(&self) -> anyhow::Result<Option<DateTime<Utc>>>;

  /// Persist a new checkpoint.
  async fn save_checkpoint(&self, checkpoint: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Order persistence consumed by the dispatcher.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
  /// Persist a new order.
  ///
  /// Idempotent on `intent.trace_id`: creating the same trace id twice
  /// stores one order.
  ///
  /// # Errors
  /// Returns error if the store cannot be written; the snapshot is then
  /// retried.
  async fn create_order(&self, intent: &OrderIntent) -> anyhow::Result<()>;

  /// Cancel an order.
  ///
  /// A no-op for unknown or already terminal orders. Ownership of the
  /// order is not checked at this boundary.
  async fn cancel_order(&self, order_id: &OrderId) -> anyhow::Result<()>;
}

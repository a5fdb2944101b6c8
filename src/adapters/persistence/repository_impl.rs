//! File Repository - Concrete Adapter for the Persistence Ports
//!
//! Wraps `CheckpointFile` (atomic JSON cursor), `OrderLog`, and
//! `RefundLog` (JSONL append-only files) into a single struct that
//! implements `CheckpointStore`, `OrderRepository`, and `RefundHandler`.
//!
//! The usecases layer only knows about the traits, never about files or
//! JSON.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::checkpoint::CheckpointFile;
use super::orders::OrderLog;
use super::refunds::RefundLog;
use crate::domain::intent::{OrderIntent, RefundReason};
use crate::domain::snapshot::{OrderId, Snapshot};
use crate::ports::refund::RefundHandler;
use crate::ports::repository::{CheckpointStore, OrderRepository};

/// File-backed repository for checkpoint, orders, and refunds.
pub struct FileRepository {
    checkpoint: CheckpointFile,
    orders: OrderLog,
    refunds: RefundLog,
}

impl FileRepository {
    /// Open all stores under `data_dir`, creating it as needed.
    pub async fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let checkpoint = CheckpointFile::new(dir).await?;
        let orders = OrderLog::open(dir).await?;
        let refunds = RefundLog::open(dir).await?;
        Ok(Self {
            checkpoint,
            orders,
            refunds,
        })
    }

    /// Order log.
    pub fn orders(&self) -> &OrderLog {
        &self.orders
    }

    /// Refund log.
    pub fn refunds(&self) -> &RefundLog {
        &self.refunds
    }
}

#[async_trait]
impl CheckpointStore for FileRepository {
    async fn load_checkpoint(&self) -> Result<Option<DateTime<Utc>>> {
        self.checkpoint.load().await
    }

    async fn save_checkpoint(&self, checkpoint: DateTime<Utc>) -> Result<()> {
        self.checkpoint.save(checkpoint).await
    }
}

#[async_trait]
impl OrderRepository for FileRepository {
    async fn create_order(&self, intent: &OrderIntent) -> Result<()> {
        self.orders.create(intent).await
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<()> {
        self.orders.cancel(order_id).await
    }
}

#[async_trait]
impl RefundHandler for FileRepository {
    async fn refund(&self, snapshot: &Snapshot, reason: RefundReason) -> Result<()> {
        self.refunds.record(snapshot, reason).await
    }
}

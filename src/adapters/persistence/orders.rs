//! Order Log - Append-only JSONL Order Book Handoff
//!
//! Persists order lifecycle events to `orders.jsonl`. Each line is a
//! self-contained JSON event; the in-memory index is rebuilt from the
//! file at startup so redelivered snapshots stay idempotent across
//! restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::jsonl::{append_line, read_lines};
use crate::domain::intent::OrderIntent;
use crate::domain::snapshot::OrderId;

/// Lifecycle state of a logged order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Created and not cancelled.
    Open,
    /// Cancelled by its owner.
    Cancelled,
}

/// One line of `orders.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    /// A new order was handed to the engine.
    Created {
        /// Full order parameters.
        intent: OrderIntent,
    },
    /// An order was cancelled.
    Cancelled {
        /// Cancelled order id.
        order_id: OrderId,
        /// When the cancellation was recorded.
        at: DateTime<Utc>,
    },
}

/// JSONL order log with an idempotency index.
pub struct OrderLog {
    /// Path to orders.jsonl.
    path: PathBuf,
    /// Order id → status. Held across the append so check-and-write is
    /// atomic.
    index: Mutex<HashMap<OrderId, OrderStatus>>,
}

impl OrderLog {
    /// Open the order log in `data_dir`, replaying existing events.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("orders.jsonl");
        let events: Vec<OrderEvent> = read_lines(&path).await?;

        let mut index = HashMap::new();
        for event in &events {
            match event {
                OrderEvent::Created { intent } => {
                    index
                        .entry(intent.trace_id.clone())
                        .or_insert(OrderStatus::Open);
                }
                OrderEvent::Cancelled { order_id, .. } => {
                    index.insert(order_id.clone(), OrderStatus::Cancelled);
                }
            }
        }

        info!(events = events.len(), orders = index.len(), "Order log replayed");
        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    /// Record a new order; repeated trace ids are ignored.
    #[instrument(skip(self, intent), fields(order_id = %intent.order_id()))]
    pub async fn create(&self, intent: &OrderIntent) -> Result<()> {
        let mut index = self.index.lock().await;
        if index.contains_key(intent.order_id()) {
            debug!("Order already recorded");
            return Ok(());
        }

        append_line(
            &self.path,
            &OrderEvent::Created {
                intent: intent.clone(),
            },
        )
        .await?;
        index.insert(intent.order_id().to_string(), OrderStatus::Open);
        Ok(())
    }

    /// Cancel an open order; unknown or cancelled ids are a no-op.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: &OrderId) -> Result<()> {
        let mut index = self.index.lock().await;
        match index.get(order_id) {
            Some(OrderStatus::Open) => {}
            Some(OrderStatus::Cancelled) => {
                debug!("Order already cancelled");
                return Ok(());
            }
            None => {
                debug!("Cancel for unknown order ignored");
                return Ok(());
            }
        }

        append_line(
            &self.path,
            &OrderEvent::Cancelled {
                order_id: order_id.clone(),
                at: Utc::now(),
            },
        )
        .await?;
        index.insert(order_id.clone(), OrderStatus::Cancelled);
        Ok(())
    }

    /// Current status of an order.
    pub async fn status(&self, order_id: &str) -> Option<OrderStatus> {
        self.index.lock().await.get(order_id).copied()
    }

    /// Number of distinct orders ever created.
    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    /// Whether no order has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }
}

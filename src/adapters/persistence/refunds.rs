//! Refund Log - Append-only JSONL Refund Obligations
//!
//! Every refund decision is appended to `refunds.jsonl` for the transfer
//! service to execute. Entries are deduplicated by snapshot id.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::jsonl::{append_line, read_lines};
use crate::domain::intent::RefundReason;
use crate::domain::snapshot::{AccountId, AssetId, Snapshot};

/// One pending refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub snapshot_id: String,
    pub trace_id: String,
    pub asset_id: AssetId,
    pub amount: Decimal,
    /// Account the funds go back to.
    pub recipient: AccountId,
    pub reason: RefundReason,
    pub recorded_at: DateTime<Utc>,
}

impl RefundRecord {
    fn from_snapshot(snapshot: &Snapshot, reason: RefundReason) -> Self {
        Self {
            snapshot_id: snapshot.snapshot_id.clone(),
            trace_id: snapshot.trace_id.clone(),
            asset_id: snapshot.asset_id.clone(),
            amount: snapshot.amount,
            recipient: snapshot.opponent_id.clone(),
            reason,
            recorded_at: Utc::now(),
        }
    }
}

/// JSONL refund log.
pub struct RefundLog {
    path: PathBuf,
    seen: Mutex<HashSet<String>>,
}

impl RefundLog {
    /// Open the refund log in `data_dir`, replaying existing records.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("refunds.jsonl");
        let records: Vec<RefundRecord> = read_lines(&path).await?;
        let seen: HashSet<String> = records.into_iter().map(|r| r.snapshot_id).collect();

        info!(refunds = seen.len(), "Refund log replayed");
        Ok(Self {
            path,
            seen: Mutex::new(seen),
        })
    }

    /// Record a refund for `snapshot` unless one is already logged.
    #[instrument(skip(self, snapshot), fields(snapshot_id = %snapshot.snapshot_id, reason = %reason))]
    pub async fn record(&self, snapshot: &Snapshot, reason: RefundReason) -> Result<()> {
        let mut seen = self.seen.lock().await;
        if seen.contains(&snapshot.snapshot_id) {
            debug!("Refund already recorded");
            return Ok(());
        }

        append_line(&self.path, &RefundRecord::from_snapshot(snapshot, reason)).await?;
        seen.insert(snapshot.snapshot_id.clone());
        Ok(())
    }

    /// Whether a refund for `snapshot_id` has been recorded.
    pub async fn contains(&self, snapshot_id: &str) -> bool {
        self.seen.lock().await.contains(snapshot_id)
    }

    /// All refund records on disk.
    pub async fn records(&self) -> Result<Vec<RefundRecord>> {
        read_lines(&self.path).await
    }
}

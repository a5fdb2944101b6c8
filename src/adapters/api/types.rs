//! Ledger API Request/Response Types
//!
//! Defines the wire types for the ledger network's snapshot endpoint
//! and their conversion into domain snapshots.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::domain::snapshot::Snapshot;

/// Envelope returned by every ledger API call.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEnvelope {
  /// Snapshot page (absent on error).
  #[serde(default, deserialize_with = "null_as_default")]
  pub data: Vec<SnapshotPayload>,
  /// Error string or object (absent on success).
  #[serde(default)]
  pub error: Option<serde_json::Value>,
}

impl SnapshotEnvelope {
  /// The API error message, if the envelope carries one.
  pub fn error_message(&self) -> Option<String> {
    match self.error.as_ref()? {
      serde_json::Value::Null => None,
      serde_json::Value::String(s) if s.is_empty() => None,
      serde_json::Value::String(s) => Some(s.clone()),
      other => Some(other.to_string()),
    }
  }
}

/// Nested asset reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetRef {
  /// Asset id.
  #[serde(default, deserialize_with = "null_as_default")]
  pub asset_id: String,
}

/// One snapshot as served by the ledger API.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
  /// Snapshot id.
  #[serde(default, deserialize_with = "null_as_default")]
  pub snapshot_id: String,
  /// Transfer amount as a decimal string.
  #[serde(default, deserialize_with = "null_as_default")]
  pub amount: String,
  /// Nested asset (network snapshots).
  #[serde(default)]
  pub asset: Option<AssetRef>,
  /// Flat asset id (account snapshots).
  #[serde(default)]
  pub asset_id: Option<String>,
  /// Creation time.
  pub created_at: DateTime<Utc>,
  /// Sender-supplied trace id.
  #[serde(default, deserialize_with = "null_as_default")]
  pub trace_id: String,
  /// Receiving account.
  #[serde(default, deserialize_with = "null_as_default")]
  pub user_id: String,
  /// Sending counterparty.
  #[serde(default, deserialize_with = "null_as_default")]
  pub opponent_id: String,
  /// Memo payload.
  #[serde(default, deserialize_with = "null_as_default")]
  pub data: String,
}

impl SnapshotPayload {
  /// Convert to a domain snapshot.
  ///
  /// An unparsable amount becomes zero, which the pipeline guards treat
  /// as exhausted.
  pub fn into_snapshot(self) -> Snapshot {
    let amount = Decimal::from_str(&self.amount)
      .or_else(|_| Decimal::from_scientific(&self.amount))
      .unwrap_or_else(|e| {
        warn!(
          snapshot_id = %self.snapshot_id,
          amount = %self.amount,
          error = %e,
          "Unparsable snapshot amount, treating as zero"
        );
        Decimal::ZERO
      });

    let asset_id = self
      .asset
      .map(|a| a.asset_id)
      .filter(|id| !id.is_empty())
      .or(self.asset_id)
      .unwrap_or_default();

    Snapshot {
      snapshot_id: self.snapshot_id,
      amount,
      asset_id,
      created_at: self.created_at,
      trace_id: self.trace_id,
      user_id: self.user_id,
      opponent_id: self.opponent_id,
      data: self.data,
    }
  }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

//! Ledger snapshot domain types.
//!
//! A snapshot is one observed asset transfer on the ledger network.
//! Snapshots are read-only to this crate: they are fetched, inspected,
//! and either turned into an exchange action or ignored.
//!
//! Also hosts the fixed-precision decimal helpers shared by the
//! resolver and the pipeline guards.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────
// Identifier aliases
// ────────────────────────────────────────────

/// Ledger asset identifier (UUID-shaped, compared as an opaque string).
pub type AssetId = String;

/// Exchange order identifier. Orders are keyed by the trace id of the
/// snapshot that created them.
pub type OrderId = String;

/// Ledger account / user identifier.
pub type AccountId = String;

/// Number of fractional digits every amount, price and quantity is
/// floored to.
pub const PRECISION: u32 = 8;

/// Floor a decimal to [`PRECISION`] fractional digits.
pub fn floor8(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRECISION, RoundingStrategy::ToNegativeInfinity)
}

/// A value is exhausted when nothing positive survives flooring to the
/// working precision. Negative values (outgoing transfers) are exhausted.
pub fn is_exhausted(value: Decimal) -> bool {
    floor8(value) <= Decimal::ZERO
}

/// One asset transfer observed on the ledger network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ledger-assigned snapshot identifier.
    pub snapshot_id: String,
    /// Transfer amount, exact decimal.
    pub amount: Decimal,
    /// Asset that was transferred.
    pub asset_id: AssetId,
    /// Creation time on the ledger; drives the checkpoint.
    pub created_at: DateTime<Utc>,
    /// Sender-supplied idempotency key for the resulting order.
    pub trace_id: String,
    /// Receiving account.
    pub user_id: AccountId,
    /// Sending counterparty.
    pub opponent_id: AccountId,
    /// Opaque memo payload (base64 text).
    pub data: String,
}

//! Intent Resolver - From Instruction + Transfer to Exchange Action
//!
//! Combines a decoded memo instruction with the transfer that carried it
//! and decides exactly one outcome:
//! - `Create`: place a new limit order
//! - `Cancel`: cancel an existing order
//! - `Refund`: return the deposit, because no valid order can be derived
//!
//! Resolution order (first match wins):
//! 1. no instruction → refund
//! 2. reference asset equals the deposited asset → refund
//! 3. non-nil target order → cancel
//! 4. price floors to zero or does not parse → refund
//! 5. ask: quote = reference, base = deposit; bid: quote = deposit,
//!    base = reference, quantity = amount / price; other side → refund
//! 6. pair policy rejects → refund
//!
//! All arithmetic is exact decimal, floored to 8 fractional digits.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::memo::{Instruction, Side};
use super::pair_policy::PairPolicy;
use super::snapshot::{floor8, is_exhausted, AccountId, AssetId, OrderId, Snapshot};

/// Concrete order parameters derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Ask or bid.
    pub side: Side,
    /// Pricing asset.
    pub quote: AssetId,
    /// Quantity asset.
    pub base: AssetId,
    /// Order quantity in base units.
    pub quantity: Decimal,
    /// Limit price in quote units per base unit.
    pub price: Decimal,
    /// Counterparty that placed the order.
    pub counterparty: AccountId,
    /// Idempotency key; doubles as the order id.
    pub trace_id: String,
    /// Snapshot creation time.
    pub created_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Order id under which the engine books this intent.
    pub fn order_id(&self) -> &str {
        &self.trace_id
    }
}

/// Why a snapshot is refunded instead of traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    /// Memo is missing or does not decode.
    NoInstruction,
    /// Instruction references the asset being deposited.
    SelfReference,
    /// Price is unparsable or floors to zero.
    InvalidPrice,
    /// Side is neither ask nor bid.
    UnknownSide,
    /// Bid quantity floors to zero or overflows.
    InvalidQuantity,
    /// Pair policy rejects (quote, base).
    DisallowedPair,
}

impl RefundReason {
    /// Stable label for logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoInstruction => "no_instruction",
            Self::SelfReference => "self_reference",
            Self::InvalidPrice => "invalid_price",
            Self::UnknownSide => "unknown_side",
            Self::InvalidQuantity => "invalid_quantity",
            Self::DisallowedPair => "disallowed_pair",
        }
    }
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Place a new order.
    Create(OrderIntent),
    /// Cancel an existing order.
    Cancel(OrderId),
    /// Return the deposit.
    Refund(RefundReason),
}

/// Parse a decimal price string. Accepts plain and scientific notation;
/// anything else, including digit separators, is `None`.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    if raw.contains('_') {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Derives exchange actions from instructions under a pair policy.
#[derive(Debug, Clone, Default)]
pub struct IntentResolver {
    policy: PairPolicy,
}

impl IntentResolver {
    /// Create a resolver bound to `policy`.
    pub fn new(policy: PairPolicy) -> Self {
        Self { policy }
    }

    /// The pair policy in force.
    pub fn policy(&self) -> &PairPolicy {
        &self.policy
    }

    /// Resolve one snapshot and its (optional) decoded instruction.
    pub fn resolve(&self, snapshot: &Snapshot, instruction: Option<&Instruction>) -> Decision {
        let Some(instruction) = instruction else {
            return Decision::Refund(RefundReason::NoInstruction);
        };

        let reference = instruction.reference_asset_id();
        if reference == snapshot.asset_id {
            return Decision::Refund(RefundReason::SelfReference);
        }

        if let Some(order_id) = instruction.cancel_target() {
            return Decision::Cancel(order_id);
        }

        let mut quantity = floor8(snapshot.amount);
        let price = match parse_price(&instruction.price).map(floor8) {
            Some(price) if !is_exhausted(price) => price,
            _ => return Decision::Refund(RefundReason::InvalidPrice),
        };

        let (side, quote, base) = match instruction.side() {
            Some(Side::Ask) => (Side::Ask, reference, snapshot.asset_id.clone()),
            Some(Side::Bid) => {
                quantity = match quantity.checked_div(price).map(floor8) {
                    Some(q) if !is_exhausted(q) => q,
                    _ => return Decision::Refund(RefundReason::InvalidQuantity),
                };
                (Side::Bid, snapshot.asset_id.clone(), reference)
            }
            None => return Decision::Refund(RefundReason::UnknownSide),
        };

        if !self.policy.is_valid_pair(&quote, &base) {
            return Decision::Refund(RefundReason::DisallowedPair);
        }

        Decision::Create(OrderIntent {
            side,
            quote,
            base,
            quantity,
            price,
            counterparty: snapshot.opponent_id.clone(),
            trace_id: snapshot.trace_id.clone(),
            created_at: snapshot.created_at,
        })
    }
}

//! Memo instruction codec.
//!
//! A transfer memo carries a base64-wrapped MessagePack record with four
//! single-letter fields:
//!
//! | key | meaning                         | wire type                 |
//! |-----|---------------------------------|---------------------------|
//! | `S` | side (`"ASK"` / `"BID"`)        | str                       |
//! | `A` | reference asset                 | 16-byte id                |
//! | `P` | limit price                     | decimal str               |
//! | `O` | order to cancel (nil = none)    | 16-byte id                |
//!
//! Decoding fails closed: anything that is not a well-formed record
//! yields `None`, which the resolver maps to a refund.

use std::fmt;

use base64::Engine;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Order side carried by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Sell the deposited asset.
    Ask,
    /// Buy the reference asset with the deposited asset.
    Bid,
}

impl Side {
    /// Parse the wire value. The engine form `"ASK"` / `"BID"` is
    /// canonical; the single-letter `"A"` / `"B"` is also accepted.
    /// Matching is case-sensitive. Unknown values yield `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "ASK" | "A" => Some(Self::Ask),
            "BID" | "B" => Some(Self::Bid),
            _ => None,
        }
    }

    /// Engine wire value.
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Ask => "ASK",
            Self::Bid => "BID",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Trading instruction decoded from a memo.
///
/// Fields keep their raw wire form; interpretation (side parsing, price
/// rounding) belongs to the resolver so that malformed values become
/// refunds instead of decode errors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instruction {
    /// Raw side value.
    #[serde(rename = "S", default)]
    pub side: String,
    /// Asset on the other side of the trade.
    #[serde(
        rename = "A",
        default,
        deserialize_with = "deserialize_wire_id",
        serialize_with = "serialize_wire_id"
    )]
    pub reference_asset: Uuid,
    /// Limit price as a decimal string.
    #[serde(rename = "P", default)]
    pub price: String,
    /// Order to cancel; nil when the instruction places an order.
    #[serde(
        rename = "O",
        default,
        deserialize_with = "deserialize_wire_id",
        serialize_with = "serialize_wire_id"
    )]
    pub target_order: Uuid,
}

impl Instruction {
    /// Order-placing instruction with the side in engine form.
    pub fn new_order(side: Side, reference_asset: Uuid, price: impl Into<String>) -> Self {
        Self {
            side: side.as_wire().to_string(),
            reference_asset,
            price: price.into(),
            target_order: Uuid::nil(),
        }
    }

    /// Parsed side, `None` for anything but `"ASK"` / `"BID"` (or `"A"` / `"B"`).
    pub fn side(&self) -> Option<Side> {
        Side::from_wire(&self.side)
    }

    /// Reference asset in the ledger's textual asset id form.
    pub fn reference_asset_id(&self) -> String {
        self.reference_asset.hyphenated().to_string()
    }

    /// Target order id, if this instruction is a cancel request.
    pub fn cancel_target(&self) -> Option<String> {
        (!self.target_order.is_nil()).then(|| self.target_order.hyphenated().to_string())
    }
}

/// Reasons a memo does not decode into an instruction.
#[derive(Debug, Error)]
pub enum MemoError {
    #[error("memo is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("memo payload is not an instruction record: {0}")]
    Payload(#[from] rmp_serde::decode::Error),

    #[error("failed to encode instruction: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Decode a memo, reporting why it failed.
pub fn try_decode_memo(memo: &str) -> Result<Instruction, MemoError> {
    let payload = base64::engine::general_purpose::STANDARD.decode(memo)?;
    Ok(rmp_serde::from_slice(&payload)?)
}

/// Decode a memo into an instruction, or `None` when it carries none.
pub fn decode_memo(memo: &str) -> Option<Instruction> {
    match try_decode_memo(memo) {
        Ok(instruction) => Some(instruction),
        Err(e) => {
            debug!(error = %e, "Memo carries no instruction");
            None
        }
    }
}

/// Encode an instruction the way wallet clients do (named MessagePack map,
/// ids as 16-byte bin, standard base64).
pub fn encode_memo(instruction: &Instruction) -> Result<String, MemoError> {
    let payload = rmp_serde::to_vec_named(instruction)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(payload))
}

fn serialize_wire_id<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(id.as_bytes())
}

fn deserialize_wire_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
    deserializer.deserialize_any(WireIdVisitor)
}

/// Accepts every shape encoders use for a 16-byte id: `bin`, a raw
/// 16-byte `str`, an array of 16 integers, a canonical UUID string, or nil.
struct WireIdVisitor;

impl<'de> Visitor<'de> for WireIdVisitor {
    type Value = Uuid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 16-byte identifier")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Uuid, E> {
        Uuid::from_slice(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Uuid, E> {
        if v.len() == 16 {
            return self.visit_bytes(v.as_bytes());
        }
        Uuid::parse_str(v).map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Uuid, A::Error> {
        let mut bytes = [0u8; 16];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element::<u8>()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(17, &self));
        }
        Ok(Uuid::from_bytes(bytes))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Uuid, E> {
        Ok(Uuid::nil())
    }

    fn visit_none<E: de::Error>(self) -> Result<Uuid, E> {
        Ok(Uuid::nil())
    }
}

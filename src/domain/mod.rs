//! Domain layer - Core business logic and models.
//!
//! Pure decision logic for snapshot ingestion: the snapshot model, the
//! memo instruction codec, the pair policy, and the intent resolver.
//! Nothing here performs I/O (hexagonal architecture inner ring), so
//! every rule is testable in isolation.

pub mod intent;
pub mod memo;
pub mod pair_policy;
pub mod snapshot;

// Re-export core types for convenience
pub use intent::{Decision, IntentResolver, OrderIntent, RefundReason};
pub use memo::{decode_memo, encode_memo, Instruction, MemoError, Side};
pub use pair_policy::PairPolicy;
pub use snapshot::{floor8, is_exhausted, AccountId, AssetId, OrderId, Snapshot, PRECISION};

//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the checkpoint, order, and refund ports using append-only
//! JSONL files and an atomic JSON cursor. No database dependency.

pub mod checkpoint;
mod jsonl;
pub mod orders;
pub mod refunds;
pub mod repository_impl;

pub use checkpoint::CheckpointFile;
pub use orders::{OrderLog, OrderStatus};
pub use refunds::{RefundLog, RefundRecord};
pub use repository_impl::FileRepository;

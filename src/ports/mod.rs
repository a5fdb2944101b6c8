//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `SnapshotSource`: Paginated snapshot reads from the ledger network
//! - `CheckpointStore`: Durable ingestion cursor
//! - `OrderRepository`: Order creation and cancellation
//! - `RefundHandler`: Compensating transfers owed to senders

pub mod ledger;
pub mod refund;
pub mod repository;

pub use ledger::SnapshotSource;
pub use refund::RefundHandler;
pub use repository::{CheckpointStore, OrderRepository};

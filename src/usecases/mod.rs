//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! ingestion workflow.
//!
//! Use cases:
//! - `SnapshotPoller`: Checkpointed fetch-process loop
//! - `SnapshotProcessor`: Guard → decode → resolve → dispatch per snapshot
//! - `Dispatcher`: Routes a decision to exactly one port call

pub mod dispatcher;
pub mod pipeline;
pub mod poller;

pub use dispatcher::Dispatcher;
pub use pipeline::{IgnoreReason, Outcome, PipelineError, SnapshotProcessor};
pub use poller::{PassResult, PollerConfig, SnapshotPoller};

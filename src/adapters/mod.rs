//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, file I/O). Each sub-module groups
//! adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: Ledger network REST API client, auth, and snapshot source
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: Checkpoint file plus JSONL order and refund logs

pub mod api;
pub mod metrics;
pub mod persistence;

//! Ledger Network API Adapter
//!
//! Implements the HTTP client for reading snapshots from the ledger
//! network's REST API.
//!
//! Sub-modules:
//! - `auth`: HMAC-SHA256 request signing
//! - `client`: HTTP client with timeout and retries
//! - `snapshots`: `SnapshotSource` implementation
//! - `types`: API response type definitions

pub mod auth;
pub mod client;
pub mod snapshots;
pub mod types;

pub use auth::LedgerAuth;
pub use client::{LedgerClient, LedgerClientConfig};
pub use snapshots::LedgerSnapshotSource;

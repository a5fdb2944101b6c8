//! Snapshot Pipeline - Guard, Decode, Resolve, Dispatch
//!
//! Processes a single snapshot end to end:
//! 1. Guard filters: foreign account, missing sender/trace id, exhausted
//!    amount → ignored (no side effect, still counts as processed)
//! 2. Decode the memo into an instruction (fails closed)
//! 3. Resolve the instruction against the transfer
//! 4. Dispatch the decision to exactly one port
//!
//! Only port failures are errors. Every malformed instruction is a
//! refund outcome.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::intent::{IntentResolver, RefundReason};
use crate::domain::memo::decode_memo;
use crate::domain::snapshot::{is_exhausted, AccountId, OrderId, Snapshot};
use crate::ports::refund::RefundHandler;
use crate::ports::repository::OrderRepository;

use super::dispatcher::Dispatcher;

/// Why a snapshot was skipped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
  /// Transfer went to an account other than the exchange's.
  ForeignAccount,
  /// Sender or trace id is empty.
  Unattributed,
  /// Amount floors to nothing at working precision.
  ExhaustedAmount,
}

impl IgnoreReason {
  /// Stable label for logs.
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::ForeignAccount => "foreign_account",
      Self::Unattributed => "unattributed",
      Self::ExhaustedAmount => "exhausted_amount",
    }
  }
}

impl fmt::Display for IgnoreReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of successfully processing one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Skipped by a guard.
  Ignored(IgnoreReason),
  /// Order created (id = trace id).
  Created(OrderId),
  /// Cancel issued for the order.
  Cancelled(OrderId),
  /// Refund recorded.
  Refunded(RefundReason),
}

impl Outcome {
  /// Metrics label.
  pub const fn label(&self) -> &'static str {
    match self {
      Self::Ignored(_) => "ignored",
      Self::Created(_) => "created",
      Self::Cancelled(_) => "cancelled",
      Self::Refunded(_) => "refunded",
    }
  }
}

/// A snapshot could not be fully applied. The checkpoint must not move
/// past it.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("create order failed for trace {trace_id}: {cause:#}")]
  CreateOrder {
    trace_id: String,
    cause: anyhow::Error,
  },

  #[error("cancel order {order_id} failed: {cause:#}")]
  CancelOrder {
    order_id: OrderId,
    cause: anyhow::Error,
  },

  #[error("refund of snapshot {snapshot_id} failed: {cause:#}")]
  Refund {
    snapshot_id: String,
    cause: anyhow::Error,
  },

  #[error("checkpoint persist failed: {cause:#}")]
  Checkpoint { cause: anyhow::Error },
}

/// Applies the guard → decode → resolve → dispatch chain to snapshots.
pub struct SnapshotProcessor<O: OrderRepository, R: RefundHandler> {
  /// The exchange's own ledger account.
  account_id: AccountId,
  /// Instruction resolver (owns the pair policy).
  resolver: IntentResolver,
  /// Port router.
  dispatcher: Dispatcher<O, R>,
}

impl<O: OrderRepository, R: RefundHandler> SnapshotProcessor<O, R> {
  /// Create a processor for snapshots received by `account_id`.
  pub fn new(
    account_id: impl Into<AccountId>,
    resolver: IntentResolver,
    orders: Arc<O>,
    refunds: Arc<R>,
  ) -> Self {
    Self {
      account_id: account_id.into(),
      resolver,
      dispatcher: Dispatcher::new(orders, refunds),
    }
  }

  /// Check the guard filters. `Some` means the snapshot is ignored.
  pub fn guard(&self, snapshot: &Snapshot) -> Option<IgnoreReason> {
    if snapshot.user_id != self.account_id {
      return Some(IgnoreReason::ForeignAccount);
    }
    if snapshot.opponent_id.is_empty() || snapshot.trace_id.is_empty() {
      return Some(IgnoreReason::Unattributed);
    }
    if is_exhausted(snapshot.amount) {
      return Some(IgnoreReason::ExhaustedAmount);
    }
    None
  }

  /// Process one snapshot.
  ///
  /// # Errors
  /// Returns `PipelineError` when a downstream port fails.
  #[instrument(
    skip(self, snapshot),
    fields(
      snapshot_id = %snapshot.snapshot_id,
      trace_id = %snapshot.trace_id,
      created_at = %snapshot.created_at
    )
  )]
  pub async fn process(&self, snapshot: &Snapshot) -> Result<Outcome, PipelineError> {
    if let Some(reason) = self.guard(snapshot) {
      debug!(reason = %reason, "Snapshot ignored");
      return Ok(Outcome::Ignored(reason));
    }

    let instruction = decode_memo(&snapshot.data);
    let decision = self.resolver.resolve(snapshot, instruction.as_ref());
    debug!(decision = ?decision, "Snapshot resolved");

    self.dispatcher.dispatch(snapshot, decision).await
  }
}

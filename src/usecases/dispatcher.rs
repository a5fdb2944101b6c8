//! Dispatcher - Route a Decision to Exactly One Downstream Action
//!
//! Maps each resolved decision onto a single port call:
//! - `Create` → `OrderRepository::create_order`
//! - `Cancel` → `OrderRepository::cancel_order`
//! - `Refund` → `RefundHandler::refund`
//!
//! Port failures surface as `PipelineError` so the poller can hold the
//! checkpoint and redeliver the snapshot.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::intent::Decision;
use crate::domain::snapshot::Snapshot;
use crate::ports::refund::RefundHandler;
use crate::ports::repository::OrderRepository;

use super::pipeline::{Outcome, PipelineError};

/// Delegates decisions to the order and refund ports.
pub struct Dispatcher<O: OrderRepository, R: RefundHandler> {
  /// Order persistence port.
  orders: Arc<O>,
  /// Refund port.
  refunds: Arc<R>,
}

impl<O: OrderRepository, R: RefundHandler> Dispatcher<O, R> {
  /// Create a dispatcher over the given ports.
  pub fn new(orders: Arc<O>, refunds: Arc<R>) -> Self {
    Self { orders, refunds }
  }

  /// Apply `decision` for `snapshot`.
  ///
  /// # Errors
  /// Returns the failing port's error; nothing is retried here.
  #[instrument(skip(self, snapshot, decision), fields(snapshot_id = %snapshot.snapshot_id))]
  pub async fn dispatch(
    &self,
    snapshot: &Snapshot,
    decision: Decision,
  ) -> Result<Outcome, PipelineError> {
    match decision {
      Decision::Create(intent) => {
        self
          .orders
          .create_order(&intent)
          .await
          .map_err(|cause| PipelineError::CreateOrder {
            trace_id: intent.trace_id.clone(),
            cause,
          })?;
        info!(
          order_id = %intent.order_id(),
          side = %intent.side,
          quote = %intent.quote,
          base = %intent.base,
          quantity = %intent.quantity,
          price = %intent.price,
          counterparty = %intent.counterparty,
          "Order created"
        );
        Ok(Outcome::Created(intent.trace_id))
      }
      Decision::Cancel(order_id) => {
        self
          .orders
          .cancel_order(&order_id)
          .await
          .map_err(|cause| PipelineError::CancelOrder {
            order_id: order_id.clone(),
            cause,
          })?;
        info!(
          order_id = %order_id,
          requested_by = %snapshot.opponent_id,
          "Order cancel requested"
        );
        Ok(Outcome::Cancelled(order_id))
      }
      Decision::Refund(reason) => {
        self
          .refunds
          .refund(snapshot, reason)
          .await
          .map_err(|cause| PipelineError::Refund {
            snapshot_id: snapshot.snapshot_id.clone(),
            cause,
          })?;
        info!(
          reason = %reason,
          amount = %snapshot.amount,
          asset = %snapshot.asset_id,
          opponent = %snapshot.opponent_id,
          "Refund owed"
        );
        Ok(Outcome::Refunded(reason))
      }
    }
  }
}

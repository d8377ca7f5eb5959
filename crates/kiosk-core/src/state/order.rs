//! Order state machine implementation.
//!
//! Every status change is written through to the store. Writes that follow
//! the transition table (pending -> production -> {completed, cancelled},
//! plus pending -> cancelled) are routine; any other write is still applied
//! but logged as a warning.

use kiosk_storage::{StorageError, StorageService};
use kiosk_types::{Order, OrderStatus};
use std::sync::Arc;

/// Applies status changes to orders and persists them.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Moves an order whose current status is known to `new_status`.
	///
	/// Returns the number of stored rows updated.
	pub async fn transition_order_status(
		&self,
		order: &mut Order,
		new_status: OrderStatus,
	) -> Result<usize, StorageError> {
		if !Self::is_valid_transition(&order.status, &new_status) {
			tracing::warn!(
				order_id = order.id,
				from = %order.status,
				to = %new_status,
				"Status change outside the order state machine"
			);
		}
		self.set_order_status(order, new_status).await
	}

	/// Overwrites the status of an order without consulting its previous one.
	pub async fn set_order_status(
		&self,
		order: &mut Order,
		new_status: OrderStatus,
	) -> Result<usize, StorageError> {
		order.status = new_status;
		let rows = self.storage.update(order).await?;
		tracing::info!(order_id = order.id, status = %new_status, "Order status updated");
		Ok(rows)
	}

	/// Checks if a state transition is valid
	pub fn is_valid_transition(from: &OrderStatus, to: &OrderStatus) -> bool {
		from.can_transition_to(*to)
	}
}

//! Recovery module for restoring the queue from storage after a restart.
//!
//! Orders still pending in the store were accepted but never pulled into
//! production. They are re-queued in the order the store returns them so
//! that no accepted work is lost when the process restarts.

use crate::queue::OrderQueue;
use kiosk_storage::StorageService;
use std::sync::Arc;
use tracing::instrument;

/// Report of the recovery operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
	/// Number of pending orders read from storage.
	pub total_orders: usize,
	/// Number of orders added to the queue.
	pub enqueued: usize,
	/// Number of orders skipped because their id was already queued.
	pub duplicates: usize,
}

/// Service responsible for re-populating the queue from storage.
pub struct RecoveryService {
	storage: Arc<StorageService>,
}

impl RecoveryService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Enqueues every pending order held in storage.
	///
	/// Never fails: a storage read error is logged by the store and recovers
	/// nothing.
	#[instrument(skip_all)]
	pub async fn recover_pending(&self, queue: &mut OrderQueue) -> RecoveryReport {
		tracing::info!("Starting queue recovery from storage");

		let orders = self.storage.get_pending().await;
		let mut report = RecoveryReport {
			total_orders: orders.len(),
			..RecoveryReport::default()
		};

		if orders.is_empty() {
			tracing::info!("No pending orders to recover");
			return report;
		}

		for order in orders {
			let order_id = order.id;
			if queue.enqueue(order) {
				report.enqueued += 1;
			} else {
				report.duplicates += 1;
				tracing::warn!(order_id, "Pending order already queued, skipping");
			}
		}

		tracing::info!(
			"Recovery complete: {} pending orders found, {} enqueued, {} duplicates",
			report.total_orders,
			report.enqueued,
			report.duplicates
		);

		report
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiosk_storage::implementations::memory::MemoryStorage;
	use kiosk_types::{Order, OrderStatus};

	#[tokio::test]
	async fn test_recovers_pending_in_store_order() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let mut done = Order::new(2, 1);
		done.status = OrderStatus::Completed;
		storage.insert(&Order::new(3, 1)).await.unwrap();
		storage.insert(&done).await.unwrap();
		storage.insert(&Order::new(1, 1)).await.unwrap();
		storage.insert(&Order::new(3, 2)).await.unwrap();

		let mut queue = OrderQueue::new();
		let report = RecoveryService::new(storage)
			.recover_pending(&mut queue)
			.await;

		assert_eq!(
			report,
			RecoveryReport {
				total_orders: 3,
				enqueued: 2,
				duplicates: 1,
			}
		);
		let ids: Vec<i64> = queue.iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![3, 1]);
	}

	#[tokio::test]
	async fn test_empty_store_recovers_nothing() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let mut queue = OrderQueue::new();
		let report = RecoveryService::new(storage)
			.recover_pending(&mut queue)
			.await;
		assert_eq!(report, RecoveryReport::default());
		assert!(queue.is_empty());
	}
}

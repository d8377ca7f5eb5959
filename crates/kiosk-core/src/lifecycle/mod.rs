//! Order lifecycle manager.
//!
//! Owns the production queue and the persistent store and exposes the
//! create/fetch/finish/cancel operations the HTTP boundary calls. One async
//! mutex guards the queue and is held for the whole of each operation,
//! including its storage I/O, so operations never interleave.

use crate::queue::OrderQueue;
use crate::recovery::{RecoveryReport, RecoveryService};
use crate::state::OrderStateMachine;
use kiosk_storage::{StorageError, StorageService};
use kiosk_types::{decode_order, Order, OrderDecodeError, OrderStatus};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
	/// The submitted order document is malformed.
	#[error("Validation error: {0}")]
	Validation(#[from] OrderDecodeError),
	/// A storage write failed.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Coordinates the queue and the store through the order state machine.
pub struct OrderLifecycle {
	queue: Mutex<OrderQueue>,
	storage: Arc<StorageService>,
	state_machine: OrderStateMachine,
	recovery: RecoveryService,
}

impl OrderLifecycle {
	/// Creates a lifecycle manager with an empty queue.
	///
	/// Call [`OrderLifecycle::recover_pending`] before serving requests.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			queue: Mutex::new(OrderQueue::new()),
			state_machine: OrderStateMachine::new(storage.clone()),
			recovery: RecoveryService::new(storage.clone()),
			storage,
		}
	}

	/// Re-queues every order still pending in the store.
	pub async fn recover_pending(&self) -> RecoveryReport {
		let mut queue = self.queue.lock().await;
		self.recovery.recover_pending(&mut queue).await
	}

	/// Accepts a new order.
	///
	/// The order is queued before it is stored. A failed store insert is
	/// returned as an error but the queued entry stays in place.
	#[instrument(skip_all, fields(order_id = tracing::field::Empty))]
	pub async fn create_order(&self, raw_data: Value) -> Result<Order, LifecycleError> {
		let order = decode_order(raw_data)?;
		tracing::Span::current().record("order_id", order.id);

		let mut queue = self.queue.lock().await;
		if !queue.enqueue(order.clone()) {
			tracing::warn!(order_id = order.id, "Order id already queued, keeping existing entry");
		}
		self.storage.insert(&order).await?;

		tracing::info!(order_id = order.id, queued = queue.size(), "Order received");
		Ok(order)
	}

	/// Pulls the head of the queue into production.
	///
	/// Returns `None` when the queue is empty.
	#[instrument(skip_all)]
	pub async fn get_next_order(&self) -> Result<Option<Order>, LifecycleError> {
		let mut queue = self.queue.lock().await;
		let Some(mut order) = queue.dequeue() else {
			tracing::debug!("Queue is empty");
			return Ok(None);
		};

		self.state_machine
			.transition_order_status(&mut order, OrderStatus::Production)
			.await?;

		tracing::info!(order_id = order.id, remaining = queue.size(), "Order sent to production");
		Ok(Some(order))
	}

	/// Marks the submitted order as completed.
	///
	/// Returns `Ok(false)` only when the document cannot be decoded. The
	/// previous status is not checked and the queue is not touched.
	#[instrument(skip_all)]
	pub async fn finish_order(&self, raw_data: Value) -> Result<bool, LifecycleError> {
		let mut order = match decode_order(raw_data) {
			Ok(order) => order,
			Err(e) => {
				tracing::warn!(error = %e, "Rejected finish request");
				return Ok(false);
			},
		};

		let _queue = self.queue.lock().await;
		self.state_machine
			.set_order_status(&mut order, OrderStatus::Completed)
			.await?;
		Ok(true)
	}

	/// Cancels the submitted order, dropping it from the queue if present.
	///
	/// Returns `Ok(false)` only when the document cannot be decoded.
	#[instrument(skip_all)]
	pub async fn cancel_order(&self, raw_data: Value) -> Result<bool, LifecycleError> {
		let mut order = match decode_order(raw_data) {
			Ok(order) => order,
			Err(e) => {
				tracing::warn!(error = %e, "Rejected cancel request");
				return Ok(false);
			},
		};

		let mut queue = self.queue.lock().await;
		if queue.remove(&order) {
			tracing::debug!(order_id = order.id, "Cancelled order removed from queue");
		}
		self.state_machine
			.set_order_status(&mut order, OrderStatus::Cancelled)
			.await?;
		Ok(true)
	}

	/// Cancels an order by id, looking in the queue first and then the store.
	///
	/// Returns `Ok(false)` when neither knows the id. Cancelling an order that
	/// is already cancelled succeeds again.
	#[instrument(skip_all, fields(order_id = id))]
	pub async fn cancel_order_by_identifier(&self, id: i64) -> Result<bool, LifecycleError> {
		let mut queue = self.queue.lock().await;

		let found = match queue.get_by_identifier(id) {
			Some(order) => Some(order.clone()),
			None => self.storage.get_by_identifier(id).await,
		};
		let Some(mut order) = found else {
			tracing::info!(order_id = id, "Order to cancel not found");
			return Ok(false);
		};

		queue.remove(&order);
		self.state_machine
			.transition_order_status(&mut order, OrderStatus::Cancelled)
			.await?;
		Ok(true)
	}

	/// Reads the stored status of an order. The queue is not consulted.
	pub async fn get_order_status(&self, id: i64) -> Option<OrderStatus> {
		let _queue = self.queue.lock().await;
		self.storage
			.get_by_identifier(id)
			.await
			.map(|order| order.status)
	}

	/// Number of orders waiting in the queue.
	pub async fn queue_size(&self) -> usize {
		self.queue.lock().await.size()
	}

	/// Copy of the queued orders, head first.
	pub async fn queue_snapshot(&self) -> Vec<Order> {
		self.queue.lock().await.orders()
	}

	/// Human-readable table of the queue.
	pub async fn queue_state(&self) -> String {
		self.queue.lock().await.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use kiosk_storage::implementations::memory::MemoryStorage;
	use kiosk_storage::{OrderRecord, StorageInterface};
	use kiosk_types::ConfigSchema;
	use serde_json::json;

	fn lifecycle() -> OrderLifecycle {
		OrderLifecycle::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	/// Backend that accepts nothing.
	struct ReadOnlyStorage;

	#[async_trait]
	impl StorageInterface for ReadOnlyStorage {
		async fn insert(&self, _record: OrderRecord) -> Result<(), StorageError> {
			Err(StorageError::Backend("read-only".into()))
		}

		async fn update(&self, _record: OrderRecord) -> Result<usize, StorageError> {
			Err(StorageError::Backend("read-only".into()))
		}

		async fn find_by_id(&self, _id: i64) -> Result<Vec<OrderRecord>, StorageError> {
			Ok(Vec::new())
		}

		async fn find_by_status(&self, _status: &str) -> Result<Vec<OrderRecord>, StorageError> {
			Ok(Vec::new())
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(kiosk_storage::implementations::memory::MemoryStorageSchema)
		}
	}

	#[tokio::test]
	async fn test_create_rejects_malformed_document() {
		let lifecycle = lifecycle();
		let result = lifecycle.create_order(json!([1, 2])).await;
		assert!(matches!(result, Err(LifecycleError::Validation(_))));

		let result = lifecycle.create_order(json!({"id": "five"})).await;
		assert!(matches!(result, Err(LifecycleError::Validation(_))));
		assert_eq!(lifecycle.queue_size().await, 0);
	}

	#[tokio::test]
	async fn test_create_keeps_status_as_provided() {
		let lifecycle = lifecycle();
		let order = lifecycle
			.create_order(json!({"id": 4, "box": 2, "size": 1}))
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(lifecycle.get_order_status(4).await, Some(OrderStatus::Pending));
	}

	#[tokio::test]
	async fn test_duplicate_create_queues_once_but_stores_twice() {
		let backend = MemoryStorage::new();
		let lifecycle =
			OrderLifecycle::new(Arc::new(StorageService::new(Box::new(backend.clone()))));
		lifecycle.create_order(json!({"id": 1, "box": 1})).await.unwrap();
		lifecycle.create_order(json!({"id": 1, "box": 2})).await.unwrap();

		let snapshot = lifecycle.queue_snapshot().await;
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].box_id, 1);

		let rows = backend.find_by_id(1).await.unwrap();
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0].box_id, 1);
		assert_eq!(rows[1].box_id, 2);
	}

	#[tokio::test]
	async fn test_finish_and_cancel_report_parse_failures_only() {
		let lifecycle = lifecycle();
		assert!(!lifecycle.finish_order(json!("nope")).await.unwrap());
		assert!(!lifecycle.cancel_order(json!({"status": "lost"})).await.unwrap());

		assert!(lifecycle.finish_order(json!({"id": 404})).await.unwrap());
		assert!(lifecycle.cancel_order(json!({"id": 404})).await.unwrap());
		assert_eq!(lifecycle.get_order_status(404).await, None);
	}

	#[tokio::test]
	async fn test_finish_leaves_queue_untouched() {
		let lifecycle = lifecycle();
		lifecycle.create_order(json!({"id": 6})).await.unwrap();
		assert!(lifecycle.finish_order(json!({"id": 6})).await.unwrap());

		assert_eq!(lifecycle.queue_size().await, 1);
		assert_eq!(lifecycle.get_order_status(6).await, Some(OrderStatus::Completed));
	}

	#[tokio::test]
	async fn test_cancel_removes_from_queue() {
		let lifecycle = lifecycle();
		lifecycle.create_order(json!({"id": 1})).await.unwrap();
		lifecycle.create_order(json!({"id": 2})).await.unwrap();

		assert!(lifecycle.cancel_order(json!({"id": 1, "box": 9})).await.unwrap());
		let ids: Vec<i64> = lifecycle.queue_snapshot().await.iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![2]);
		assert_eq!(lifecycle.get_order_status(1).await, Some(OrderStatus::Cancelled));
	}

	#[tokio::test]
	async fn test_cancel_by_id_falls_back_to_store() {
		let lifecycle = lifecycle();
		lifecycle.create_order(json!({"id": 8})).await.unwrap();
		let order = lifecycle.get_next_order().await.unwrap().unwrap();
		assert_eq!(order.status, OrderStatus::Production);

		assert!(lifecycle.cancel_order_by_identifier(8).await.unwrap());
		assert_eq!(lifecycle.get_order_status(8).await, Some(OrderStatus::Cancelled));
	}

	#[tokio::test]
	async fn test_write_failures_propagate() {
		let lifecycle = OrderLifecycle::new(Arc::new(StorageService::new(Box::new(ReadOnlyStorage))));

		let result = lifecycle.create_order(json!({"id": 3})).await;
		assert!(matches!(result, Err(LifecycleError::Storage(_))));
		// The queued entry is not rolled back.
		assert_eq!(lifecycle.queue_size().await, 1);

		assert!(matches!(
			lifecycle.get_next_order().await,
			Err(LifecycleError::Storage(_))
		));
		assert!(lifecycle.finish_order(json!({"id": 3})).await.is_err());
		assert!(lifecycle.cancel_order(json!({"id": 3})).await.is_err());
	}

	#[tokio::test]
	async fn test_queue_state_rendering() {
		let lifecycle = lifecycle();
		assert!(lifecycle.queue_state().await.contains("Queue is empty"));
		lifecycle.create_order(json!({"id": 12, "box": 3})).await.unwrap();
		assert!(lifecycle.queue_state().await.contains("12"));
	}
}

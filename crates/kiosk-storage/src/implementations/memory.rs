//! In-memory storage backend implementation for the kiosk service.
//!
//! Rows live in a vector for the life of the process. Useful for tests and
//! for running the service without a database.

use crate::{OrderRecord, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use kiosk_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// No persistence across restarts. Clones share the same rows.
#[derive(Clone)]
pub struct MemoryStorage {
	/// Rows in insertion order.
	rows: Arc<RwLock<Vec<OrderRecord>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			rows: Arc::new(RwLock::new(Vec::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn insert(&self, record: OrderRecord) -> Result<(), StorageError> {
		self.rows.write().await.push(record);
		Ok(())
	}

	async fn update(&self, record: OrderRecord) -> Result<usize, StorageError> {
		let mut rows = self.rows.write().await;
		let mut affected = 0;
		for row in rows.iter_mut().filter(|row| row.id == record.id) {
			row.box_id = record.box_id;
			row.status = record.status.clone();
			row.size = record.size;
			row.products = record.products.clone();
			row.is_synced = 0;
			affected += 1;
		}
		Ok(affected)
	}

	async fn find_by_id(&self, id: i64) -> Result<Vec<OrderRecord>, StorageError> {
		let rows = self.rows.read().await;
		Ok(rows.iter().filter(|row| row.id == id).cloned().collect())
	}

	async fn find_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, StorageError> {
		let rows = self.rows.read().await;
		Ok(rows
			.iter()
			.filter(|row| row.status == status)
			.cloned()
			.collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(format!("Invalid memory config: {}", e)))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use kiosk_types::{Order, OrderStatus};

	fn record(id: i64, status: OrderStatus) -> OrderRecord {
		let mut order = Order::new(id, 1);
		order.status = status;
		OrderRecord::from_order(&order).unwrap()
	}

	#[tokio::test]
	async fn test_rows_keep_insertion_order() {
		let storage = MemoryStorage::new();
		storage.insert(record(2, OrderStatus::Pending)).await.unwrap();
		storage.insert(record(1, OrderStatus::Pending)).await.unwrap();
		storage.insert(record(3, OrderStatus::Completed)).await.unwrap();

		let pending = storage.find_by_status("pending").await.unwrap();
		let ids: Vec<i64> = pending.iter().map(|r| r.id).collect();
		assert_eq!(ids, vec![2, 1]);
	}

	#[tokio::test]
	async fn test_update_touches_every_row_with_id() {
		let storage = MemoryStorage::new();
		storage.insert(record(5, OrderStatus::Pending)).await.unwrap();
		storage.insert(record(5, OrderStatus::Pending)).await.unwrap();
		storage.insert(record(6, OrderStatus::Pending)).await.unwrap();

		let affected = storage
			.update(record(5, OrderStatus::Cancelled))
			.await
			.unwrap();
		assert_eq!(affected, 2);

		let rows = storage.find_by_id(5).await.unwrap();
		assert!(rows.iter().all(|r| r.status == "cancelled"));
		assert_eq!(storage.find_by_id(6).await.unwrap()[0].status, "pending");
		assert_eq!(storage.update(record(9, OrderStatus::Pending)).await.unwrap(), 0);
	}

	#[test]
	fn test_factory_rejects_non_table() {
		assert!(create_storage(&toml::Value::Table(Default::default())).is_ok());
		assert!(matches!(
			create_storage(&toml::Value::Integer(1)),
			Err(StorageError::Configuration(_))
		));
	}
}

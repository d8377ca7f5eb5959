//! Persistent store for the kiosk order service.
//!
//! This crate keeps the durable record of every order ever submitted. Rows
//! live in an `Orders` table behind a pluggable [`StorageInterface`] backend
//! (SQLite, a JSON file, or process memory), and [`StorageService`] exposes
//! the order-level operations used by the lifecycle manager.
//!
//! Writes propagate backend failures to the caller. Reads degrade: a failed
//! or undecodable read is logged and reported as "not found" or as an empty
//! result.

use async_trait::async_trait;
use kiosk_types::{ConfigSchema, ImplementationRegistry, Order, OrderStatus};
use thiserror::Error;

pub mod codec;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod sqlite;
}

pub use codec::{decode_products, encode_products, OrderRecord, ORDERS_TABLE};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the row-level interface of storage backends.
///
/// Backends keep rows in insertion order and never deduplicate by id.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Appends a new row.
	async fn insert(&self, record: OrderRecord) -> Result<(), StorageError>;

	/// Overwrites box, status, size and products of every row with the
	/// record's id and clears their sync flag. Returns the number of rows
	/// affected.
	async fn update(&self, record: OrderRecord) -> Result<usize, StorageError>;

	/// Returns all rows with the given id, in insertion order.
	async fn find_by_id(&self, id: i64) -> Result<Vec<OrderRecord>, StorageError>;

	/// Returns all rows whose status column equals `status`, in insertion order.
	async fn find_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, sqlite};

	vec![
		(sqlite::Registry::NAME, sqlite::Registry::factory()),
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Order-level store over a storage backend.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Appends a new row for the order.
	///
	/// Does not check for an existing row with the same id.
	pub async fn insert(&self, order: &Order) -> Result<(), StorageError> {
		let record = OrderRecord::from_order(order)?;
		match self.backend.insert(record).await {
			Ok(()) => {
				tracing::info!(order_id = order.id, status = %order.status, "Order stored");
				Ok(())
			},
			Err(e) => {
				tracing::error!(order_id = order.id, error = %e, "Failed to store order");
				Err(e)
			},
		}
	}

	/// Overwrites the stored rows of the order.
	///
	/// Updating an unknown id is not an error; it is logged and reported as
	/// zero affected rows.
	pub async fn update(&self, order: &Order) -> Result<usize, StorageError> {
		let record = OrderRecord::from_order(order)?;
		match self.backend.update(record).await {
			Ok(0) => {
				tracing::warn!(order_id = order.id, "No stored order matched update");
				Ok(0)
			},
			Ok(rows) => {
				tracing::debug!(order_id = order.id, status = %order.status, rows, "Order updated");
				Ok(rows)
			},
			Err(e) => {
				tracing::error!(order_id = order.id, error = %e, "Failed to update order");
				Err(e)
			},
		}
	}

	/// Fetches a stored order by id.
	///
	/// When several rows share the id, the first decodable one by insertion
	/// wins and the ambiguity is logged.
	pub async fn get_by_identifier(&self, id: i64) -> Option<Order> {
		let records = match self.backend.find_by_id(id).await {
			Ok(records) => records,
			Err(e) => {
				tracing::error!(order_id = id, error = %e, "Failed to read order");
				return None;
			},
		};

		if records.len() > 1 {
			tracing::warn!(
				order_id = id,
				rows = records.len(),
				"More than one stored row for order, using first occurrence"
			);
		}

		let order = records.iter().find_map(|record| decode_record(record));
		if order.is_none() {
			tracing::debug!(order_id = id, "Order not found in storage");
		}
		order
	}

	/// Returns every stored order whose status is exactly pending.
	pub async fn get_pending(&self) -> Vec<Order> {
		let records = match self
			.backend
			.find_by_status(OrderStatus::Pending.as_str())
			.await
		{
			Ok(records) => records,
			Err(e) => {
				tracing::error!(error = %e, "Failed to read pending orders");
				return Vec::new();
			},
		};

		let orders: Vec<Order> = records.iter().filter_map(decode_record).collect();
		tracing::info!("Found {} pending orders in storage", orders.len());
		orders
	}
}

fn decode_record(record: &OrderRecord) -> Option<Order> {
	match record.to_order() {
		Ok(order) => Some(order),
		Err(e) => {
			tracing::error!(order_id = record.id, error = %e, "Skipping undecodable order row");
			None
		},
	}
}

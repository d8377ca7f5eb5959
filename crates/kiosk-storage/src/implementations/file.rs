//! File storage backend for the kiosk service.
//!
//! The whole `Orders` table is kept as one JSON array in
//! `<storage_path>/Orders.json`. Every write rewrites the document, first to
//! a temporary file and then renamed over the old one.

use crate::{
	OrderRecord, StorageError, StorageFactory, StorageInterface, StorageRegistry, ORDERS_TABLE,
};
use async_trait::async_trait;
use kiosk_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Directory used when the config does not name one.
pub const DEFAULT_STORAGE_PATH: &str = "./data/storage";

/// File-based storage implementation.
pub struct FileStorage {
	/// Path of the JSON document.
	path: PathBuf,
	/// Serializes read-modify-write cycles on the document.
	write_lock: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage keeping its document under `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			path: base_path.join(format!("{}.json", ORDERS_TABLE)),
			write_lock: Mutex::new(()),
		}
	}

	async fn load(&self) -> Result<Vec<OrderRecord>, StorageError> {
		let data = match fs::read(&self.path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		serde_json::from_slice(&data).map_err(|e| {
			StorageError::Serialization(format!("corrupt {}: {}", self.path.display(), e))
		})
	}

	async fn save(&self, rows: &[OrderRecord]) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let data =
			serde_json::to_vec_pretty(rows).map_err(|e| StorageError::Serialization(e.to_string()))?;

		let temp_path = self.path.with_extension("tmp");
		fs::write(&temp_path, data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn insert(&self, record: OrderRecord) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut rows = self.load().await?;
		rows.push(record);
		self.save(&rows).await
	}

	async fn update(&self, record: OrderRecord) -> Result<usize, StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut rows = self.load().await?;

		let mut affected = 0;
		for row in rows.iter_mut().filter(|row| row.id == record.id) {
			row.box_id = record.box_id;
			row.status = record.status.clone();
			row.size = record.size;
			row.products = record.products.clone();
			row.is_synced = 0;
			affected += 1;
		}

		if affected > 0 {
			self.save(&rows).await?;
		}
		Ok(affected)
	}

	async fn find_by_id(&self, id: i64) -> Result<Vec<OrderRecord>, StorageError> {
		let _guard = self.write_lock.lock().await;
		let rows = self.load().await?;
		Ok(rows.into_iter().filter(|row| row.id == id).collect())
	}

	async fn find_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, StorageError> {
		let _guard = self.write_lock.lock().await;
		let rows = self.load().await?;
		Ok(rows.into_iter().filter(|row| row.status == status).collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("storage_path", FieldType::String)]);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Directory holding the orders document (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(format!("Invalid file config: {}", e)))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

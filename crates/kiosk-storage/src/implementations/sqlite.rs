//! SQLite storage backend for the kiosk service.
//!
//! Orders are kept in a single `Orders` table of an embedded SQLite database.
//! The table has no primary key: rows are appended on every insert and
//! ordered by `rowid`.
//!
//! `rusqlite` is blocking, so every statement runs on the tokio blocking pool
//! behind a shared connection mutex.

use crate::{OrderRecord, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use kiosk_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Database file used when the config does not name one.
pub const DEFAULT_DATABASE_PATH: &str = "order_log.db";

const SCHEMA_SQL: &str = "
	CREATE TABLE IF NOT EXISTS Orders (
		id INTEGER DEFAULT -1,
		box INTEGER NOT NULL,
		status TEXT NOT NULL,
		size INTEGER NOT NULL,
		products TEXT NOT NULL,
		timestamp TEXT DEFAULT (datetime('now', 'localtime')),
		is_synced INTEGER DEFAULT 0
	);
";

const INSERT_SQL: &str = "INSERT INTO Orders (id, box, status, size, products, timestamp, is_synced)
	VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const UPDATE_SQL: &str = "UPDATE Orders
	SET box = ?1, status = ?2, size = ?3, products = ?4, is_synced = 0
	WHERE id = ?5";

const SELECT_BY_ID_SQL: &str = "SELECT id, box, status, size, products, timestamp, is_synced
	FROM Orders WHERE id = ?1 ORDER BY rowid ASC";

const SELECT_BY_STATUS_SQL: &str = "SELECT id, box, status, size, products, timestamp, is_synced
	FROM Orders WHERE status = ?1 ORDER BY rowid ASC";

/// SQLite-backed storage implementation.
pub struct SqliteStorage {
	conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
	/// Opens (or creates) the database at `path` and ensures the schema exists.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
		let path = path.as_ref();
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent).map_err(|e| {
				StorageError::Backend(format!("failed to create {}: {}", parent.display(), e))
			})?;
		}

		let conn = Connection::open(path).map_err(|e| {
			StorageError::Backend(format!("failed to open {}: {}", path.display(), e))
		})?;
		Self::with_connection(conn)
	}

	/// Creates a private in-memory database.
	pub fn in_memory() -> Result<Self, StorageError> {
		let conn = Connection::open_in_memory()
			.map_err(|e| StorageError::Backend(format!("failed to open database: {}", e)))?;
		Self::with_connection(conn)
	}

	fn with_connection(conn: Connection) -> Result<Self, StorageError> {
		conn.execute_batch(SCHEMA_SQL)
			.map_err(|e| StorageError::Backend(format!("schema init failed: {}", e)))?;
		Ok(Self {
			conn: Arc::new(Mutex::new(conn)),
		})
	}

	/// Sets how long a statement waits on a locked database file.
	pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), StorageError> {
		let guard = self.lock()?;
		guard
			.busy_timeout(timeout)
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
		self.conn
			.lock()
			.map_err(|e| StorageError::Backend(format!("connection mutex poisoned: {}", e)))
	}

	/// Runs `op` against the connection on the blocking pool.
	async fn run<T, F>(&self, op: F) -> Result<T, StorageError>
	where
		T: Send + 'static,
		F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
	{
		let conn = Arc::clone(&self.conn);
		tokio::task::spawn_blocking(move || {
			let guard = conn
				.lock()
				.map_err(|e| StorageError::Backend(format!("connection mutex poisoned: {}", e)))?;
			op(&guard).map_err(|e| StorageError::Backend(e.to_string()))
		})
		.await
		.map_err(|e| StorageError::Backend(format!("blocking task failed: {}", e)))?
	}

	async fn select(&self, sql: &'static str, key: Key) -> Result<Vec<OrderRecord>, StorageError> {
		self.run(move |conn| {
			let mut stmt = conn.prepare(sql)?;
			let rows = match key {
				Key::Id(id) => stmt.query_map(params![id], row_to_record)?,
				Key::Status(status) => stmt.query_map(params![status], row_to_record)?,
			};
			let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
			Ok(records)
		})
		.await
	}
}

enum Key {
	Id(i64),
	Status(String),
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRecord> {
	Ok(OrderRecord {
		id: row.get::<_, Option<i64>>(0)?.unwrap_or(kiosk_types::UNASSIGNED_ID),
		box_id: row.get(1)?,
		status: row.get(2)?,
		size: row.get(3)?,
		products: row.get(4)?,
		timestamp: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
		is_synced: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
	})
}

#[async_trait]
impl StorageInterface for SqliteStorage {
	async fn insert(&self, record: OrderRecord) -> Result<(), StorageError> {
		self.run(move |conn| {
			conn.execute(
				INSERT_SQL,
				params![
					record.id,
					record.box_id,
					record.status,
					record.size,
					record.products,
					record.timestamp,
					record.is_synced
				],
			)?;
			Ok(())
		})
		.await
	}

	async fn update(&self, record: OrderRecord) -> Result<usize, StorageError> {
		self.run(move |conn| {
			conn.execute(
				UPDATE_SQL,
				params![
					record.box_id,
					record.status,
					record.size,
					record.products,
					record.id
				],
			)
		})
		.await
	}

	async fn find_by_id(&self, id: i64) -> Result<Vec<OrderRecord>, StorageError> {
		self.select(SELECT_BY_ID_SQL, Key::Id(id)).await
	}

	async fn find_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, StorageError> {
		self.select(SELECT_BY_STATUS_SQL, Key::Status(status.to_string()))
			.await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SqliteStorageSchema)
	}
}

/// Configuration schema for SqliteStorage.
pub struct SqliteStorageSchema;

impl ConfigSchema for SqliteStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("database_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("database_path must not be empty".to_string()),
					}
				}),
				Field::new(
					"busy_timeout_ms",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a SQLite storage backend from configuration.
///
/// Configuration parameters:
/// - `database_path`: Database file (default: "order_log.db")
/// - `busy_timeout_ms`: Wait on a locked database in milliseconds (default: SQLite's)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	SqliteStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(format!("Invalid sqlite config: {}", e)))?;

	let database_path = config
		.get("database_path")
		.and_then(|v| v.as_str())
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

	let storage = SqliteStorage::open(&database_path)?;
	if let Some(ms) = config.get("busy_timeout_ms").and_then(|v| v.as_integer()) {
		storage.set_busy_timeout(Duration::from_millis(ms as u64))?;
	}

	tracing::debug!(path = %database_path.display(), "Opened order database");
	Ok(Box::new(storage))
}

/// Registry for the sqlite storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "sqlite";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

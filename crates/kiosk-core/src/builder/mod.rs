//! Builder for constructing the order lifecycle manager.
//!
//! Storage backends are created from configuration through factory
//! functions keyed by implementation name. Only the primary backend is
//! constructed; the other configured entries are left untouched. Startup
//! recovery runs before the lifecycle manager is returned.

use crate::OrderLifecycle;
use kiosk_config::Config;
use kiosk_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions needed to build an [`OrderLifecycle`].
pub struct KioskFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for an [`OrderLifecycle`] with a pluggable storage backend.
pub struct KioskBuilder {
	config: Config,
}

impl KioskBuilder {
	/// Creates a new KioskBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the lifecycle manager and re-queues pending orders.
	pub async fn build<SF>(self, factories: KioskFactories<SF>) -> Result<OrderLifecycle, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary_storage = &self.config.storage.primary;
		let Some(factory) = factories.storage_factories.get(primary_storage) else {
			return Err(BuilderError::MissingComponent(format!(
				"No storage implementation named '{}'",
				primary_storage
			)));
		};

		for name in self.config.storage.implementations.keys() {
			if name == primary_storage {
				continue;
			}
			if factories.storage_factories.contains_key(name) {
				tracing::debug!(component = "storage", implementation = %name, "Not primary, skipping");
			} else {
				tracing::warn!(component = "storage", implementation = %name, "Unknown implementation, skipping");
			}
		}

		let primary_config = self
			.config
			.storage
			.implementations
			.get(primary_storage)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary_storage
				))
			})?;

		let storage_backend = factory(primary_config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary_storage,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary_storage, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %primary_storage, enabled = true, "Loaded");

		let storage = Arc::new(StorageService::new(storage_backend));
		let lifecycle = OrderLifecycle::new(storage);

		let report = lifecycle.recover_pending().await;
		tracing::info!(
			kiosk = %self.config.kiosk.id,
			recovered = report.enqueued,
			"Order lifecycle ready"
		);

		Ok(lifecycle)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiosk_config::ConfigBuilder;
	use kiosk_storage::get_all_implementations;
	use kiosk_storage::StorageFactory;
	use tempfile::TempDir;

	fn factories() -> KioskFactories<StorageFactory> {
		KioskFactories {
			storage_factories: get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_with_memory_storage() {
		let config = ConfigBuilder::new().kiosk_id("kiosk-test").build();

		let lifecycle = KioskBuilder::new(config).build(factories()).await.unwrap();
		assert_eq!(lifecycle.queue_size().await, 0);
	}

	#[tokio::test]
	async fn test_build_recovers_from_sqlite() {
		let dir = TempDir::new().unwrap();
		let db = dir.path().join("orders.db");
		let config: Config = format!(
			"[kiosk]\nid = \"kiosk-test\"\n[storage]\nprimary = \"sqlite\"\n[storage.implementations.sqlite]\ndatabase_path = \"{}\"\n",
			db.display()
		)
		.parse()
		.unwrap();

		let first = KioskBuilder::new(config.clone())
			.build(factories())
			.await
			.unwrap();
		first
			.create_order(serde_json::json!({"id": 1, "box": 1}))
			.await
			.unwrap();
		drop(first);

		let second = KioskBuilder::new(config).build(factories()).await.unwrap();
		assert_eq!(second.queue_size().await, 1);
	}

	#[tokio::test]
	async fn test_unknown_primary_is_missing_component() {
		let config: Config = r#"
[kiosk]
id = "kiosk-test"
[storage]
primary = "redis"
[storage.implementations.redis]
"#
		.parse()
		.unwrap();

		let result = KioskBuilder::new(config).build(factories()).await;
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[tokio::test]
	async fn test_invalid_backend_config() {
		let config: Config = r#"
[kiosk]
id = "kiosk-test"
[storage]
primary = "sqlite"
[storage.implementations.sqlite]
database_path = 42
"#
		.parse()
		.unwrap();

		let result = KioskBuilder::new(config).build(factories()).await;
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[tokio::test]
	async fn test_only_primary_backend_is_constructed() {
		let dir = TempDir::new().unwrap();
		let db = dir.path().join("unused.db");
		let config: Config = format!(
			"[kiosk]\nid = \"kiosk-test\"\n[storage]\nprimary = \"memory\"\n[storage.implementations.memory]\n[storage.implementations.sqlite]\ndatabase_path = \"{}\"\n",
			db.display()
		)
		.parse()
		.unwrap();

		KioskBuilder::new(config).build(factories()).await.unwrap();
		assert!(!db.exists());
	}
}

//! Configuration builder for tests and local runs.
//!
//! Produces a valid [`Config`] without a TOML file. The default targets the
//! in-memory store with the API disabled.

use crate::{ApiConfig, Config, KioskConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	kiosk_id: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a builder for an in-memory kiosk named "test-kiosk".
	pub fn new() -> Self {
		Self {
			kiosk_id: "test-kiosk".to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations: HashMap::new(),
			api: None,
		}
	}

	/// Sets the kiosk ID.
	pub fn kiosk_id(mut self, id: impl Into<String>) -> Self {
		self.kiosk_id = id.into();
		self
	}

	/// Sets the primary storage implementation.
	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	/// Adds configuration for one storage implementation.
	pub fn storage_implementation(mut self, name: impl Into<String>, config: toml::Value) -> Self {
		self.storage_implementations.insert(name.into(), config);
		self
	}

	/// Sets the API configuration.
	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config`.
	///
	/// The primary implementation always gets an entry, empty when none was
	/// supplied, so the result passes validation.
	pub fn build(mut self) -> Config {
		self.storage_implementations
			.entry(self.storage_primary.clone())
			.or_insert_with(|| toml::Value::Table(toml::map::Map::new()));

		Config {
			kiosk: KioskConfig { id: self.kiosk_id },
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
			},
			api: self.api,
		}
	}
}

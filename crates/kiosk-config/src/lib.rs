//! Configuration module for the kiosk order service.
//!
//! Configuration is read from TOML. Before parsing, `${VAR}` and
//! `${VAR:-default}` placeholders are replaced with environment values.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

pub mod builders;
mod loader;

pub use builders::ConfigBuilder;
pub use loader::ConfigLoader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the kiosk service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this kiosk.
	pub kiosk: KioskConfig,
	/// Configuration for the order store.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the kiosk instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KioskConfig {
	/// Unique identifier for this kiosk.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

fn default_api_host() -> String {
	"0.0.0.0".to_string()
}

/// Port the kiosk API listens on unless configured otherwise.
fn default_api_port() -> u16 {
	1607
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following its include directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf
			.parent()
			.filter(|p| !p.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));

		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		ConfigLoader::new(base_dir).load_config(file_name).await
	}

	/// Returns the API configuration, or the disabled default when absent.
	pub fn api_or_default(&self) -> ApiConfig {
		self.api.clone().unwrap_or_default()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// Backend tables are checked later by each backend's own schema.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.kiosk.id.trim().is_empty() {
			return Err(ConfigError::Validation("Kiosk ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.host.trim().is_empty() {
				return Err(ConfigError::Validation(
					"API host cannot be empty when the API is enabled".into(),
				));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[kiosk]
id = "kiosk-01"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("KIOSK_TEST_DB", "/var/lib/kiosk/orders.db");
		let input = r#"database_path = "${KIOSK_TEST_DB}""#;
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, r#"database_path = "/var/lib/kiosk/orders.db""#);
		std::env::remove_var("KIOSK_TEST_DB");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "port = ${KIOSK_TEST_UNSET_PORT:-1607}\nhost = \"x\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "port = 1607\nhost = \"x\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("id = \"${KIOSK_TEST_MISSING_VAR}\"");
		assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("KIOSK_TEST_MISSING_VAR")));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.kiosk.id, "kiosk-01");
		assert_eq!(config.storage.primary, "memory");
		assert!(config.api.is_none());

		let api = config.api_or_default();
		assert!(!api.enabled);
		assert_eq!(api.port, 1607);
	}

	#[test]
	fn test_api_section() {
		let input = format!("{}\n[api]\nenabled = true\nport = 8080\n", MINIMAL);
		let config: Config = input.parse().unwrap();
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "0.0.0.0");
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn test_validation_errors() {
		let empty_id = MINIMAL.replace("kiosk-01", " ");
		assert!(matches!(
			empty_id.parse::<Config>(),
			Err(ConfigError::Validation(msg)) if msg.contains("Kiosk ID")
		));

		let wrong_primary = MINIMAL.replace("primary = \"memory\"", "primary = \"sqlite\"");
		assert!(matches!(
			wrong_primary.parse::<Config>(),
			Err(ConfigError::Validation(msg)) if msg.contains("'sqlite'")
		));

		assert!(matches!(
			"[kiosk]\nid = 3".parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}
}

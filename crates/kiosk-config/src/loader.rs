//! Loader for configuration split across several files.
//!
//! A file may name other files in a top-level `include` entry (a string or an
//! array of strings, relative to the loader's base directory). Included files
//! may include further files. Every top-level section must come from exactly
//! one file, and a file may be loaded only once.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Configuration loader that handles multi-file configurations with includes.
pub struct ConfigLoader {
	/// Base path for resolving relative includes
	base_path: PathBuf,
	/// Canonical paths of files already read
	loaded_files: HashSet<PathBuf>,
	/// Which file each top-level section came from
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	/// Creates a new ConfigLoader with the given base path.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads a configuration file and everything it includes.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let path = self.resolve_path(config_path)?;
		let mut combined = toml::map::Map::new();
		self.merge_file(&path, &mut combined).await?;

		let config_str = toml::to_string(&toml::Value::Table(combined)).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		config_str.parse()
	}

	/// Reads one file, merges its sections into `combined`, then follows its
	/// includes depth first.
	async fn merge_file(
		&mut self,
		path: &Path,
		combined: &mut toml::map::Map<String, toml::Value>,
	) -> Result<(), ConfigError> {
		let content = self.load_file(path).await?;
		let mut table = match toml::from_str::<toml::Value>(&content)? {
			toml::Value::Table(table) => table,
			_ => {
				return Err(ConfigError::Parse(format!(
					"{} is not a TOML table",
					path.display()
				)))
			},
		};

		let includes = match table.remove("include") {
			Some(value) => Self::parse_includes(&value)?,
			None => Vec::new(),
		};

		for (key, value) in table {
			if let Some(existing_source) = self.section_sources.get(&key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing_source.display(),
					path.display()
				)));
			}
			self.section_sources.insert(key.clone(), path.to_path_buf());
			combined.insert(key, value);
		}

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			Box::pin(self.merge_file(&include_path, combined)).await?;
		}

		Ok(())
	}

	/// Reads a file once and resolves environment variables in it.
	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical_path = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical_path.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical_path.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	fn parse_includes(value: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		match value {
			toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
			toml::Value::Array(items) => items
				.iter()
				.map(|item| {
					item.as_str().map(PathBuf::from).ok_or_else(|| {
						ConfigError::Validation("Include array must contain only strings".into())
					})
				})
				.collect(),
			_ => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	/// Resolves a path relative to the base path.
	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

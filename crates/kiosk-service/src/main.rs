//! Main entry point for the kiosk order service.
//!
//! Loads configuration, builds the order lifecycle manager over the
//! configured storage backend, re-queues pending orders and serves the HTTP
//! API until interrupted.

use clap::Parser;
use kiosk_config::Config;
use kiosk_core::{KioskBuilder, KioskFactories, OrderLifecycle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod apis;
mod server;

use kiosk_storage::implementations::file::create_storage as create_file_storage;
use kiosk_storage::implementations::memory::create_storage as create_memory_storage;
use kiosk_storage::implementations::sqlite::create_storage as create_sqlite_storage;

/// Command-line arguments for the kiosk service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "KIOSK_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Directory for the rotating log file
	#[arg(long, env = "KIOSK_LOG_DIR", default_value = "logs")]
	log_dir: PathBuf,

	/// Log level for the log file
	#[arg(long, default_value = "debug")]
	file_log_level: String,
}

/// Log file name prefix; files are named `orders_api.<date>.log`.
const LOG_FILE_PREFIX: &str = "orders_api";

/// Rotated log files kept on disk.
const MAX_LOG_FILES: usize = 5;

/// Opens the daily-rotating log file appender inside `log_dir`.
fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
	std::fs::create_dir_all(log_dir)?;
	let appender = RollingFileAppender::builder()
		.rotation(Rotation::DAILY)
		.filename_prefix(LOG_FILE_PREFIX)
		.filename_suffix("log")
		.max_log_files(MAX_LOG_FILES)
		.build(log_dir)?;
	Ok(appender)
}

/// Installs the console and log file subscribers.
///
/// `RUST_LOG` overrides the console level only. The returned guard flushes the
/// file writer on drop and must live until shutdown.
fn init_tracing(args: &Args) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
	let console_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	let file_filter = EnvFilter::new(&args.file_log_level);

	let (file_writer, guard) = tracing_appender::non_blocking(file_appender(&args.log_dir)?);

	tracing_subscriber::registry()
		.with(
			fmt::layer()
				.with_thread_ids(true)
				.with_target(true)
				.with_filter(console_filter),
		)
		.with(
			fmt::layer()
				.with_writer(file_writer)
				.with_ansi(false)
				.with_thread_ids(true)
				.with_target(true)
				.with_filter(file_filter),
		)
		.init();

	Ok(guard)
}

/// Main entry point for the kiosk service.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	let _log_guard = init_tracing(&args)?;

	tracing::info!("Started kiosk");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.kiosk.id);

	let lifecycle = Arc::new(build_lifecycle(config.clone()).await?);

	if lifecycle.queue_size().await > 0 {
		println!("{}", lifecycle.queue_state().await);
	}

	let api_config = config.api_or_default();
	if api_config.enabled {
		server::start_server(api_config, lifecycle).await?;
	} else {
		tracing::info!("API disabled, exiting after recovery");
		tracing::debug!("\n{}", lifecycle.queue_state().await);
	}

	tracing::info!("Stopped kiosk");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the lifecycle manager with every available storage backend.
async fn build_lifecycle(config: Config) -> Result<OrderLifecycle, Box<dyn std::error::Error>> {
	let builder = KioskBuilder::new(config);

	let storage_factories = create_factory_map!(
		kiosk_storage::StorageInterface,
		kiosk_storage::StorageError,
		"sqlite" => create_sqlite_storage,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let factories = KioskFactories { storage_factories };

	Ok(builder.build(factories).await?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_defaults() {
		let args = Args::try_parse_from(["kiosk"]).unwrap();
		assert_eq!(args.log_level, "info");

		let args = Args::try_parse_from(["kiosk", "--config", "custom.toml", "-l", "debug"]).unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
		assert_eq!(args.file_log_level, "debug");
	}

	#[test]
	fn test_file_appender_writes_into_log_dir() {
		use std::io::Write;

		let temp_dir = tempdir().unwrap();
		let log_dir = temp_dir.path().join("logs");

		let mut appender = file_appender(&log_dir).unwrap();
		appender.write_all(b"order 1 received\n").unwrap();
		appender.flush().unwrap();

		let files: Vec<String> = std::fs::read_dir(&log_dir)
			.unwrap()
			.map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
			.collect();
		assert_eq!(files.len(), 1);
		assert!(files[0].starts_with(LOG_FILE_PREFIX));
		assert!(files[0].ends_with(".log"));

		let content = std::fs::read_to_string(log_dir.join(&files[0])).unwrap();
		assert!(content.contains("order 1 received"));
	}

	#[test]
	fn test_factory_map_covers_all_backends() {
		let factories = create_factory_map!(
			kiosk_storage::StorageInterface,
			kiosk_storage::StorageError,
			"sqlite" => create_sqlite_storage,
			"file" => create_file_storage,
			"memory" => create_memory_storage,
		);

		for (name, _) in kiosk_storage::get_all_implementations() {
			assert!(factories.contains_key(name), "missing factory for {}", name);
		}
	}

	#[tokio::test]
	async fn test_build_lifecycle_from_file() {
		let temp_dir = tempdir().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		std::fs::write(
			&config_path,
			format!(
				r#"
[kiosk]
id = "kiosk-file-test"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"
"#,
				temp_dir.path().join("data").display()
			),
		)
		.unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.kiosk.id, "kiosk-file-test");

		let lifecycle = build_lifecycle(config).await.unwrap();
		assert_eq!(lifecycle.queue_size().await, 0);
	}
}

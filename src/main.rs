//! Chain sentinel service entry point.
//!
//! Polls the configured chains for event logs and fans them out to the
//! subscriptions listed in each chain configuration.
//!
//! # Flow
//! 1. Loads chain configurations from the config directory
//! 2. Connects to the RPC endpoints of every chain
//! 3. Registers each chain with the sentinel and subscribes its configured streams
//! 4. Logs every delivered event until Ctrl+C
//! 5. Stops all pollers and closes all subscriptions

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;

use crate::{
	bootstrap::{initialize_sentinel, load_chain_configs, spawn_log_consumer, Result},
	utils::{
		logging::setup_logging, metrics::server::create_metrics_server,
		parse_string_to_bytes_size,
	},
};

use clap::Parser;
use dotenvy::dotenv_override;
use std::{
	env::{set_var, var},
	path::PathBuf,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(
	name = "chain-sentinel",
	about = "Polls EVM chains for event logs and delivers them to subscribers.",
	version
)]
struct Cli {
	/// Directory containing chain configuration files (default: config/chains)
	#[arg(long, value_name = "PATH")]
	config_dir: Option<PathBuf>,

	/// Write logs to file instead of stdout
	#[arg(long)]
	log_file: bool,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Address to start the metrics server on (default: 127.0.0.1:8081)
	#[arg(long, value_name = "HOST:PORT")]
	metrics_address: Option<String>,

	/// Enable metrics server
	#[arg(long)]
	metrics: bool,

	/// Validate configuration files without starting the service
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		// Values from .env override the inherited environment, CLI flags override both
		dotenv_override().ok();

		if self.log_file {
			set_var("LOG_MODE", "file");
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}
		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}

		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}

		if self.metrics {
			set_var("METRICS_ENABLED", "true");
		}
		if let Some(address) = &self.metrics_address {
			set_var("METRICS_ADDRESS", address);
		}
	}

	fn metrics_enabled(&self) -> bool {
		self.metrics || var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false)
	}

	fn metrics_address(&self) -> String {
		self.metrics_address
			.clone()
			.or_else(|| var("METRICS_ADDRESS").ok())
			.unwrap_or_else(|| "127.0.0.1:8081".to_string())
	}
}

/// Main entry point for the chain sentinel.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded.
#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		eprintln!("Failed to setup logging: {}", e);
	});

	if cli.check {
		validate_configuration(cli.config_dir.as_deref()).await;
		return Ok(());
	}

	let chains = load_chain_configs(cli.config_dir.as_deref())
		.await
		.map_err(|e| format!("Failed to load chain configurations: {}", e))?;

	if chains.is_empty() {
		info!("No chains configured. Exiting...");
		return Ok(());
	}

	let (sentinel, subscriptions) = initialize_sentinel(&chains).await;
	if !sentinel.has_services().await {
		error!("No chain could be started. Exiting...");
		return Ok(());
	}

	let consumers: Vec<_> = subscriptions
		.into_iter()
		.map(|(chain_slug, subscription)| spawn_log_consumer(chain_slug, subscription))
		.collect();

	let metrics_server = if cli.metrics_enabled() {
		let metrics_address = cli.metrics_address();
		match create_metrics_server(metrics_address, sentinel.clone()) {
			Ok(server) => Some(server),
			Err(e) => {
				error!("Failed to create metrics server: {}", e);
				None
			}
		}
	} else {
		info!("Metrics server disabled. Use --metrics flag or METRICS_ENABLED=true to enable");
		None
	};

	info!(
		chains = ?sentinel.chain_ids().await,
		"Service started. Press Ctrl+C to shutdown"
	);

	let ctrl_c = tokio::signal::ctrl_c();
	if let Some(metrics_future) = metrics_server {
		tokio::select! {
			result = ctrl_c => {
				if let Err(e) = result {
					error!("Error waiting for Ctrl+C: {}", e);
				}
				info!("Shutdown signal received, stopping services...");
			}
			result = metrics_future => {
				if let Err(e) = result {
					error!("Metrics server error: {}", e);
				}
				info!("Metrics server stopped, shutting down services...");
			}
		}
	} else {
		if let Err(e) = ctrl_c.await {
			error!("Error waiting for Ctrl+C: {}", e);
		}
		info!("Shutdown signal received, stopping services...");
	}

	sentinel.close().await;

	// Closing the sentinel closed every queue, so consumers drain and exit
	for result in futures::future::join_all(consumers).await {
		if let Err(e) = result {
			error!("Log consumer failed: {}", e);
		}
	}

	info!("Shutdown complete");
	Ok(())
}

/// Validates configuration files and their structure
async fn validate_configuration(config_dir: Option<&std::path::Path>) {
	info!("Validating configuration files...");

	match load_chain_configs(config_dir).await {
		Ok(chains) if chains.is_empty() => {
			error!("No chain configurations found");
		}
		Ok(chains) => {
			info!("✓ Found {} chain configuration(s)", chains.len());
			for chain in &chains {
				info!(
					"✓ {} (chain id {}): {} RPC URL(s), {} subscription(s)",
					chain.name,
					chain.chain_id,
					chain.rpc_urls.len(),
					chain.subscriptions.len()
				);
			}
			info!("Configuration validation completed successfully!");
		}
		Err(e) => {
			error!("Configuration validation failed: {}", e);
		}
	}
}

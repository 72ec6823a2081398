//! Chain configuration loading and validation.
//!
//! This module implements the ConfigLoader trait for chain configurations,
//! allowing chain definitions to be loaded from JSON files.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};

use crate::{
	models::{config::error::ConfigError, ChainConfig, ConfigLoader},
	utils::normalize_string,
};

#[async_trait]
impl ConfigLoader for ChainConfig {
	/// Load all chain configurations from a directory
	///
	/// Reads and parses all JSON files in the specified directory (or default
	/// config directory) as chain configurations.
	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let chain_dir = path.unwrap_or(Path::new("config/chains"));
		let mut pairs = Vec::new();

		if !chain_dir.exists() {
			return Err(ConfigError::file_error(
				"chains directory not found",
				None,
				Some(HashMap::from([(
					"path".to_string(),
					chain_dir.display().to_string(),
				)])),
			));
		}

		for entry in std::fs::read_dir(chain_dir).map_err(|e| {
			ConfigError::file_error(
				format!("failed to read chains directory: {}", e),
				Some(Box::new(e)),
				Some(HashMap::from([(
					"path".to_string(),
					chain_dir.display().to_string(),
				)])),
			)
		})? {
			let entry = entry.map_err(|e| {
				ConfigError::file_error(
					format!("failed to read directory entry: {}", e),
					Some(Box::new(e)),
					Some(HashMap::from([(
						"path".to_string(),
						chain_dir.display().to_string(),
					)])),
				)
			})?;
			let path = entry.path();

			if !Self::is_json_file(&path) {
				continue;
			}

			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();

			let chain = Self::load_from_path(&path).await?;

			let existing: Vec<&ChainConfig> = pairs.iter().map(|(_, chain)| chain).collect();
			Self::validate_uniqueness(&existing, &chain, &path.display().to_string())?;

			pairs.push((name, chain));
		}

		Ok(T::from_iter(pairs))
	}

	/// Load a chain configuration from a specific file
	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let file = std::fs::File::open(path).map_err(|e| {
			ConfigError::file_error(
				format!("failed to open chain config file: {}", e),
				Some(Box::new(e)),
				Some(HashMap::from([(
					"path".to_string(),
					path.display().to_string(),
				)])),
			)
		})?;
		let config: ChainConfig = serde_json::from_reader(file).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse chain config: {}", e),
				Some(Box::new(e)),
				Some(HashMap::from([(
					"path".to_string(),
					path.display().to_string(),
				)])),
			)
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Validate the chain configuration
	///
	/// Ensures that:
	/// - The chain has a valid name, slug and chain id
	/// - At least one usable RPC URL is specified
	/// - Polling parameters are positive
	/// - Subscriptions reference non-zero addresses and topics
	fn validate(&self) -> Result<(), ConfigError> {
		if self.name.is_empty() {
			return Err(ConfigError::validation_error(
				"Chain name is required",
				None,
				None,
			));
		}

		if self.slug.is_empty()
			|| !self
				.slug
				.chars()
				.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
		{
			return Err(ConfigError::validation_error(
				"Slug must contain only lowercase letters, numbers, and underscores",
				None,
				None,
			));
		}

		if self.chain_id == 0 {
			return Err(ConfigError::validation_error(
				"Chain ID must be greater than 0",
				None,
				None,
			));
		}

		if self.rpc_urls.is_empty() {
			return Err(ConfigError::validation_error(
				"At least one RPC URL is required",
				None,
				None,
			));
		}

		if !self
			.rpc_urls
			.iter()
			.all(|rpc| rpc.url.starts_with("http://") || rpc.url.starts_with("https://"))
		{
			return Err(ConfigError::validation_error(
				"All RPC URLs must start with http:// or https://",
				None,
				None,
			));
		}

		if !self.rpc_urls.iter().all(|rpc| rpc.weight <= 100) {
			return Err(ConfigError::validation_error(
				"All RPC URL weights must be less than or equal to 100",
				None,
				None,
			));
		}

		if self.poll_interval_ms == 0 {
			return Err(ConfigError::validation_error(
				"Poll interval must be greater than 0",
				None,
				None,
			));
		}

		if self.fetch_timeout_ms == 0 {
			return Err(ConfigError::validation_error(
				"Fetch timeout must be greater than 0",
				None,
				None,
			));
		}

		if self.channel_capacity == 0 {
			return Err(ConfigError::validation_error(
				"Channel capacity must be greater than 0",
				None,
				None,
			));
		}

		if self.retry_policy.initial_backoff_ms > self.retry_policy.max_backoff_ms {
			return Err(ConfigError::validation_error(
				"Retry initial backoff must not exceed max backoff",
				None,
				None,
			));
		}

		for subscription in &self.subscriptions {
			if subscription.address.is_zero() || subscription.topic.is_zero() {
				return Err(ConfigError::validation_error(
					"Subscription address and topic must be non-zero",
					None,
					Some(HashMap::from([
						("address".to_string(), subscription.address.to_string()),
						("topic".to_string(), subscription.topic.to_string()),
					])),
				));
			}
		}

		self.validate_protocol();

		Ok(())
	}

	/// Validate the safety of the protocols used in the chain
	///
	/// Logs a warning for every RPC URL that is not served over TLS.
	fn validate_protocol(&self) {
		for rpc_url in &self.rpc_urls {
			if rpc_url.url.starts_with("http://") {
				tracing::warn!(
					"Chain '{}' uses an insecure RPC URL: {}",
					self.slug,
					rpc_url.url
				);
			}
		}
	}

	fn validate_uniqueness(
		instances: &[&Self],
		current_instance: &Self,
		file_path: &str,
	) -> Result<(), ConfigError> {
		let fields = [
			("name", &current_instance.name),
			("slug", &current_instance.slug),
		];

		for (field_name, field_value) in fields {
			let duplicates: Vec<_> = instances
				.iter()
				.filter(|existing| {
					let existing_value = match field_name {
						"name" => &existing.name,
						"slug" => &existing.slug,
						_ => unreachable!(),
					};
					normalize_string(existing_value) == normalize_string(field_value)
				})
				.collect();

			if !duplicates.is_empty() {
				return Err(ConfigError::validation_error(
					format!(
						"Duplicate chain {} found: '{}'",
						field_name,
						normalize_string(field_value)
					),
					None,
					Some(HashMap::from([
						(format!("chain_{}", field_name), field_value.to_string()),
						("path".to_string(), file_path.to_string()),
					])),
				));
			}
		}

		if instances
			.iter()
			.any(|existing| existing.chain_id == current_instance.chain_id)
		{
			return Err(ConfigError::validation_error(
				format!("Duplicate chain id found: {}", current_instance.chain_id),
				None,
				Some(HashMap::from([
					(
						"chain_id".to_string(),
						current_instance.chain_id.to_string(),
					),
					("path".to_string(), file_path.to_string()),
				])),
			));
		}

		Ok(())
	}
}

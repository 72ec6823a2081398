use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::RetryConfig;

fn default_fetch_timeout_ms() -> u64 {
	10_000
}

fn default_channel_capacity() -> usize {
	64
}

/// Configuration for one chain polled by the sentinel.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
	/// Human-readable name of the chain
	pub name: String,

	/// Unique identifier used in file names and logs
	pub slug: String,

	/// EVM chain id, also the key the sentinel registers the chain under
	pub chain_id: u64,

	/// RPC endpoints with their weights for failover ordering
	pub rpc_urls: Vec<RpcUrl>,

	/// How often to poll for new logs
	pub poll_interval_ms: u64,

	/// Upper bound for a single log fetch
	#[serde(default = "default_fetch_timeout_ms")]
	pub fetch_timeout_ms: u64,

	/// Capacity of each subscriber's delivery queue
	#[serde(default = "default_channel_capacity")]
	pub channel_capacity: usize,

	/// Event streams to subscribe to at startup
	#[serde(default)]
	pub subscriptions: Vec<EventSubscription>,

	/// Retry policy for RPC requests
	#[serde(default)]
	pub retry_policy: RetryConfig,
}

impl ChainConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn fetch_timeout(&self) -> Duration {
		Duration::from_millis(self.fetch_timeout_ms)
	}
}

/// RPC endpoint with its failover weight
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RpcUrl {
	pub url: String,

	/// Weight for ordering endpoints (0-100), 0 disables the endpoint
	pub weight: u32,
}

/// A configured (address, topic) subscription
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventSubscription {
	pub address: Address,
	pub topic: B256,
}

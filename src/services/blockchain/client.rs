//! Capability interfaces consumed by the polling core.
//!
//! The core never talks to a node directly. It consumes a [`ChainFetcher`] to
//! run filter queries and a [`ChainHeadSource`] to learn the current head.
//! A [`BlockChainClient`] answers single queries and is adapted into both
//! capabilities by [`ChainPoller`](crate::services::blockchain::ChainPoller).

use async_trait::async_trait;

use crate::models::{FilterQuery, Log};

/// Defines the node access needed to serve polling
///
/// Implemented by chain-specific clients such as
/// [`EvmClient`](crate::services::blockchain::EvmClient).
#[async_trait]
pub trait BlockChainClient: Send + Sync {
	/// Retrieves the latest block number from the blockchain
	///
	/// # Returns
	/// * `Result<u64, anyhow::Error>` - The latest block number or an error
	async fn block_number(&self) -> Result<u64, anyhow::Error>;

	/// Retrieves the logs matching a single filter query
	///
	/// # Arguments
	/// * `query` - Block range and address/topic constraints
	///
	/// # Returns
	/// * `Result<Vec<Log>, anyhow::Error>` - Matching logs in node order or an error
	async fn filter_logs(&self, query: &FilterQuery) -> Result<Vec<Log>, anyhow::Error>;
}

/// Runs a batch of filter queries for one poll cycle
#[async_trait]
pub trait ChainFetcher: Send + Sync {
	/// Returns the logs matching any of `queries`
	///
	/// Logs are grouped by query, in the order the queries were given.
	async fn poll(&self, queries: &[FilterQuery]) -> Result<Vec<Log>, anyhow::Error>;
}

/// Reports the current head of a chain
#[async_trait]
pub trait ChainHeadSource: Send + Sync {
	async fn block_number(&self) -> Result<u64, anyhow::Error>;
}

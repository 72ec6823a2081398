//! EVM-compatible blockchain client implementation.
//!
//! Serves head queries with `eth_blockNumber` and filter queries with
//! `eth_getLogs` against any node speaking the Ethereum JSON-RPC API.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::instrument;

use crate::{
	models::{ChainConfig, FilterQuery, Log},
	services::blockchain::{
		client::BlockChainClient,
		error::BlockChainError,
		transports::{BlockchainTransport, HttpTransportClient},
	},
};

/// Client implementation for Ethereum Virtual Machine (EVM) compatible blockchains
#[derive(Clone)]
pub struct EvmClient<T: Send + Sync + Clone> {
	/// The underlying transport for RPC communication
	http_client: T,
}

impl<T: Send + Sync + Clone> EvmClient<T> {
	/// Creates a new EVM client instance with a specific transport client
	pub fn new_with_transport(http_client: T) -> Self {
		Self { http_client }
	}
}

impl EvmClient<HttpTransportClient> {
	/// Creates a new EVM client connected to the endpoints of `chain`
	///
	/// # Returns
	/// * `Result<Self, anyhow::Error>` - New client instance or connection error
	pub async fn new(chain: &ChainConfig) -> Result<Self, anyhow::Error> {
		let client = HttpTransportClient::new(chain, None).await.map_err(|e| {
			BlockChainError::connection_error(
				format!("Failed to connect to chain '{}'", chain.slug),
				Some(e.into()),
				Some(HashMap::from([(
					"chain_id".to_string(),
					chain.chain_id.to_string(),
				)])),
			)
		})?;
		Ok(Self::new_with_transport(client))
	}
}

/// Pulls `result` out of a JSON-RPC response, surfacing node errors
fn extract_result(response: Value, method: &str) -> Result<Value, BlockChainError> {
	if let Some(error) = response.get("error") {
		let message = error
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("unknown error")
			.to_string();
		let code = error
			.get("code")
			.map(Value::to_string)
			.unwrap_or_default();
		return Err(BlockChainError::request_error(
			message,
			None,
			Some(HashMap::from([
				("method".to_string(), method.to_string()),
				("code".to_string(), code),
			])),
		));
	}

	match response {
		Value::Object(mut object) => object.remove("result").ok_or_else(|| {
			BlockChainError::internal_error(
				"Missing 'result' field",
				None,
				Some(HashMap::from([("method".to_string(), method.to_string())])),
			)
		}),
		_ => Err(BlockChainError::internal_error(
			"Response is not a JSON object",
			None,
			Some(HashMap::from([("method".to_string(), method.to_string())])),
		)),
	}
}

fn parse_hex_u64(value: &str) -> Result<u64, anyhow::Error> {
	u64::from_str_radix(value.trim_start_matches("0x"), 16)
		.map_err(|e| anyhow::anyhow!("Failed to parse hex quantity '{}': {}", value, e))
}

impl<T: Send + Sync + Clone + BlockchainTransport> EvmClient<T> {
	/// Retrieves the chain id reported by the node
	#[instrument(skip(self))]
	pub async fn chain_id(&self) -> Result<u64, anyhow::Error> {
		let response = self
			.http_client
			.send_raw_request::<Value>("eth_chainId", None)
			.await
			.with_context(|| "Failed to get chain id")?;

		let result = extract_result(response, "eth_chainId")?;
		let hex_str = result
			.as_str()
			.ok_or_else(|| anyhow::anyhow!("Chain id is not a string"))?;
		parse_hex_u64(hex_str)
	}
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport> BlockChainClient for EvmClient<T> {
	#[instrument(skip(self))]
	async fn block_number(&self) -> Result<u64, anyhow::Error> {
		let response = self
			.http_client
			.send_raw_request::<Value>("eth_blockNumber", None)
			.await
			.with_context(|| "Failed to get latest block number")?;

		let result = extract_result(response, "eth_blockNumber")?;
		let hex_str = result
			.as_str()
			.ok_or_else(|| anyhow::anyhow!("Block number is not a string"))?;
		parse_hex_u64(hex_str)
	}

	#[instrument(skip(self, query), fields(from_block = query.from_block, to_block = query.to_block))]
	async fn filter_logs(&self, query: &FilterQuery) -> Result<Vec<Log>, anyhow::Error> {
		let params = json!([{
			"fromBlock": format!("0x{:x}", query.from_block),
			"toBlock": format!("0x{:x}", query.to_block),
			"address": query.addresses,
			"topics": query.topics,
		}]);

		let response = self
			.http_client
			.send_raw_request("eth_getLogs", Some(params))
			.await
			.with_context(|| {
				format!(
					"Failed to get logs for blocks: {} - {}",
					query.from_block, query.to_block
				)
			})?;

		let result = extract_result(response, "eth_getLogs")?;
		let logs: Vec<alloy::rpc::types::Log> =
			serde_json::from_value(result).with_context(|| "Failed to parse logs")?;

		Ok(logs.into_iter().map(Log::from).collect())
	}
}

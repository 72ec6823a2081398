//! HTTP transport for JSON-RPC nodes.
//!
//! Endpoints are tried in descending weight order at construction; the first
//! one that answers a probe request becomes active and the others become
//! fallbacks. Endpoints with weight 0 are never used.

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::{
	models::ChainConfig,
	services::blockchain::transports::{
		BlockchainTransport, EndpointManager, RotatingTransport, TransientErrorRetryStrategy,
		TransportError,
	},
	utils::http::create_retryable_http_client,
};

/// JSON-RPC transport over HTTP with retries and endpoint failover
///
/// Cheap to clone; clones share the endpoint state.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	pub client: ClientWithMiddleware,
	endpoint_manager: EndpointManager,
	probe_payload: Value,
}

fn default_probe_payload() -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"method": "eth_chainId",
		"params": []
	})
}

impl HttpTransportClient {
	/// Connects to the highest weighted endpoint of `chain` that answers
	///
	/// # Arguments
	/// * `chain` - Chain configuration with RPC URLs and retry policy
	/// * `probe_payload` - JSON-RPC request used to test endpoints, `eth_chainId` by default
	///
	/// # Returns
	/// * `Result<Self, anyhow::Error>` - Connected client or an error if no endpoint answered
	pub async fn new(chain: &ChainConfig, probe_payload: Option<Value>) -> Result<Self, anyhow::Error> {
		let mut rpc_urls: Vec<_> = chain
			.rpc_urls
			.iter()
			.filter(|rpc_url| rpc_url.weight > 0)
			.collect();
		rpc_urls.sort_by(|a, b| b.weight.cmp(&a.weight));

		let base_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(32)
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(20))
			.build()
			.context("Failed to create base HTTP client")?;

		let client = create_retryable_http_client(
			&chain.retry_policy,
			base_client,
			Some(TransientErrorRetryStrategy),
		);
		let probe_payload = probe_payload.unwrap_or_else(default_probe_payload);

		for rpc_url in rpc_urls.iter() {
			let Ok(url) = Url::parse(&rpc_url.url) else {
				tracing::warn!(url = %rpc_url.url, "Skipping unparsable RPC URL");
				continue;
			};

			match client.post(url).json(&probe_payload).send().await {
				Ok(response) if response.status().is_success() => {
					let fallback_urls = rpc_urls
						.iter()
						.filter(|other| other.url != rpc_url.url)
						.map(|other| other.url.clone())
						.collect();

					tracing::debug!(chain = %chain.slug, url = %rpc_url.url, "Connected to RPC endpoint");
					return Ok(Self {
						endpoint_manager: EndpointManager::new(
							client.clone(),
							&rpc_url.url,
							fallback_urls,
						),
						client,
						probe_payload,
					});
				}
				Ok(response) => {
					tracing::warn!(url = %rpc_url.url, status = %response.status(), "RPC endpoint probe failed");
				}
				Err(e) => {
					tracing::warn!(url = %rpc_url.url, error = %e, "RPC endpoint unreachable");
				}
			}
		}

		Err(anyhow::anyhow!("All RPC URLs failed to connect"))
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	/// Sends the probe request to `url` and checks for a success status
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		let url = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;

		let response = self
			.client
			.post(url.clone())
			.json(&self.probe_payload)
			.send()
			.await
			.map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;

		if !response.status().is_success() {
			return Err(anyhow::anyhow!(
				"Failed to connect to {}: {}",
				url,
				response.status().as_u16()
			));
		}
		Ok(())
	}

	/// Points subsequent requests at `url`
	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed_url = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		let normalized_url = parsed_url.as_str().trim_end_matches('/');

		*self.endpoint_manager.active_url.write().await = normalized_url.to_string();
		Ok(())
	}
}

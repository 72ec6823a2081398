use mockall::mock;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use chain_sentinel::services::blockchain::{
	BlockchainTransport, RotatingTransport, TransportError,
};

// Mock implementation of an EVM transport client.
// Records the method and the params passed to each JSON-RPC call.
mock! {
	pub EVMTransportClient {
		pub async fn send_raw_request(&self, method: &str, params: Option<Value>) -> Result<Value, TransportError>;
		pub async fn get_current_url(&self) -> String;
	}

	impl Clone for EVMTransportClient {
		fn clone(&self) -> Self;
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for MockEVMTransportClient {
	async fn get_current_url(&self) -> String {
		self.get_current_url().await
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.send_raw_request(method, params.map(|p| p.into()))
			.await
	}
}

// Transport whose client can never be switched to a new URL
#[derive(Clone)]
pub struct AlwaysFailsToUpdateClientTransport {
	pub current_url: Arc<RwLock<String>>,
}

#[async_trait::async_trait]
impl BlockchainTransport for AlwaysFailsToUpdateClientTransport {
	async fn get_current_url(&self) -> String {
		self.current_url.read().await.clone()
	}

	async fn send_raw_request<P: Into<Value> + Send + Clone + Serialize>(
		&self,
		_method: &str,
		_params: Option<P>,
	) -> Result<Value, TransportError> {
		Ok(json!({"jsonrpc": "2.0", "result": "mocked_response", "id": 1}))
	}
}

#[async_trait::async_trait]
impl RotatingTransport for AlwaysFailsToUpdateClientTransport {
	async fn try_connect(&self, _url: &str) -> Result<(), anyhow::Error> {
		Ok(())
	}

	async fn update_client(&self, _url: &str) -> Result<(), anyhow::Error> {
		Err(anyhow::anyhow!("Simulated client update failure"))
	}
}

// Transport for endpoint manager tests: a URL is reachable when it answers
// any HTTP request, and switching URLs always succeeds
#[derive(Clone)]
pub struct MockTransport {
	client: reqwest::Client,
	current_url: Arc<RwLock<String>>,
}

impl MockTransport {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
			current_url: Arc::new(RwLock::new(String::new())),
		}
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for MockTransport {
	async fn get_current_url(&self) -> String {
		self.current_url.read().await.clone()
	}

	async fn send_raw_request<P: Into<Value> + Send + Clone + Serialize>(
		&self,
		_method: &str,
		_params: Option<P>,
	) -> Result<Value, TransportError> {
		Ok(json!({"jsonrpc": "2.0", "result": "mocked_response", "id": 1}))
	}
}

#[async_trait::async_trait]
impl RotatingTransport for MockTransport {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		self.client
			.get(url)
			.send()
			.await
			.map(|_| ())
			.map_err(|e| anyhow::anyhow!("Failed to connect: {}", e))
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		*self.current_url.write().await = url.to_string();
		Ok(())
	}
}

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

use chain_sentinel::{
	models::ChainConfig,
	services::blockchain::{BlockchainTransport, HttpTransportClient, RotatingTransport},
	utils::{tests::builders::chain::ChainConfigBuilder, RetryConfig},
};

fn no_retries() -> RetryConfig {
	RetryConfig {
		max_retries: 0,
		..RetryConfig::default()
	}
}

fn create_test_chain_with_urls(urls: Vec<(&str, u32)>) -> ChainConfig {
	urls.into_iter()
		.fold(
			ChainConfigBuilder::new().clear_rpc_urls(),
			|builder, (url, weight)| builder.add_rpc_url(url, weight),
		)
		.retry_policy(no_retries())
		.build()
}

fn create_valid_probe_mock(server: &mut ServerGuard) -> Mock {
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_chainId"})))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#)
		.create()
}

#[tokio::test]
async fn test_client_creation() {
	let mut server = Server::new_async().await;
	let mock = create_valid_probe_mock(&mut server);
	let chain = create_test_chain_with_urls(vec![(&server.url(), 100)]);

	match HttpTransportClient::new(&chain, None).await {
		Ok(transport) => {
			assert_eq!(transport.get_current_url().await, server.url());
		}
		Err(e) => panic!("Transport creation failed: {:?}", e),
	}
	mock.assert();

	let chain = create_test_chain_with_urls(vec![("invalid-url", 100)]);
	match HttpTransportClient::new(&chain, None).await {
		Err(error) => assert!(error.to_string().contains("All RPC URLs failed to connect")),
		_ => panic!("Transport creation should fail"),
	}
}

#[tokio::test]
async fn test_client_creation_with_custom_probe_payload() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "net_version"})))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"1"}"#)
		.create();

	let chain = create_test_chain_with_urls(vec![(&server.url(), 100)]);
	let probe = json!({"id": 1, "jsonrpc": "2.0", "method": "net_version", "params": []});

	let transport = HttpTransportClient::new(&chain, Some(probe)).await.unwrap();
	assert_eq!(transport.get_current_url().await, server.url());
	mock.assert();
}

#[tokio::test]
async fn test_client_creation_falls_back_to_next_endpoint() {
	let mut server = Server::new_async().await;
	let mut server2 = Server::new_async().await;

	let failing = server
		.mock("POST", "/")
		.with_status(500)
		.expect(1)
		.create();
	let healthy = create_valid_probe_mock(&mut server2);

	let chain = create_test_chain_with_urls(vec![(&server.url(), 100), (&server2.url(), 50)]);

	let transport = HttpTransportClient::new(&chain, None).await.unwrap();
	assert_eq!(transport.get_current_url().await, server2.url());
	failing.assert();
	healthy.assert();
}

#[tokio::test]
async fn test_client_creation_prefers_highest_weight() {
	let mut low = Server::new_async().await;
	let mut high = Server::new_async().await;

	let low_mock = low.mock("POST", "/").expect(0).create();
	let high_mock = create_valid_probe_mock(&mut high);

	let chain = create_test_chain_with_urls(vec![(&low.url(), 10), (&high.url(), 90)]);

	let transport = HttpTransportClient::new(&chain, None).await.unwrap();
	assert_eq!(transport.get_current_url().await, high.url());
	high_mock.assert();
	low_mock.assert();
}

#[tokio::test]
async fn test_client_creation_skips_zero_weight_endpoints() {
	let mut server = Server::new_async().await;
	let mock = server.mock("POST", "/").expect(0).create();

	let chain = create_test_chain_with_urls(vec![(&server.url(), 0)]);

	match HttpTransportClient::new(&chain, None).await {
		Err(error) => assert!(error.to_string().contains("All RPC URLs failed to connect")),
		_ => panic!("Zero weight endpoints must not be used"),
	}
	mock.assert();
}

#[tokio::test]
async fn test_client_update_client() {
	let mut server = Server::new_async().await;
	let server2 = Server::new_async().await;
	let mock = create_valid_probe_mock(&mut server);

	let chain = create_test_chain_with_urls(vec![(&server.url(), 100)]);
	let client = HttpTransportClient::new(&chain, None).await.unwrap();

	assert!(client.update_client(&server2.url()).await.is_ok());
	assert_eq!(client.get_current_url().await, server2.url());

	let e = client.update_client("invalid-url").await.unwrap_err();
	assert!(e.to_string().contains("Invalid URL: invalid-url"));
	assert_eq!(client.get_current_url().await, server2.url());

	mock.assert();
}

#[tokio::test]
async fn test_client_try_connect() {
	let mut server = Server::new_async().await;
	let mut server2 = Server::new_async().await;
	let mut server3 = Server::new_async().await;
	let _mock = create_valid_probe_mock(&mut server);
	let mock2 = create_valid_probe_mock(&mut server2);
	let _mock3 = server3.mock("POST", "/").with_status(503).create();

	let chain = create_test_chain_with_urls(vec![(&server.url(), 100)]);
	let client = HttpTransportClient::new(&chain, None).await.unwrap();

	assert!(client.try_connect(&server2.url()).await.is_ok());
	mock2.assert();

	let e = client.try_connect("invalid-url").await.unwrap_err();
	assert!(e.to_string().contains("Invalid URL"));

	let e = client.try_connect(&server3.url()).await.unwrap_err();
	assert!(e.to_string().contains("503"));
}

#[tokio::test]
async fn test_send_raw_request() {
	let mut server = Server::new_async().await;
	let probe = create_valid_probe_mock(&mut server);
	let request = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({
			"method": "eth_getLogs",
			"params": [{"fromBlock": "0x1"}]
		})))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":[]}"#)
		.create();

	let chain = create_test_chain_with_urls(vec![(&server.url(), 100)]);
	let client = HttpTransportClient::new(&chain, None).await.unwrap();

	let response = client
		.send_raw_request("eth_getLogs", Some(json!([{"fromBlock": "0x1"}])))
		.await
		.unwrap();

	assert_eq!(response["result"], Value::Array(vec![]));
	probe.assert();
	request.assert();
}

#[tokio::test]
async fn test_send_raw_request_rotates_when_rate_limited() {
	let mut primary = Server::new_async().await;
	let mut fallback = Server::new_async().await;

	let primary_probe = create_valid_probe_mock(&mut primary);
	let fallback_probe = fallback
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_chainId"})))
		.with_status(200)
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#)
		.create();
	let rate_limited = primary
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_blockNumber"})))
		.with_status(429)
		.expect(1)
		.create();
	let served = fallback
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({"method": "eth_blockNumber"})))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#)
		.expect(1)
		.create();

	let chain = create_test_chain_with_urls(vec![(&primary.url(), 100), (&fallback.url(), 50)]);
	let client = HttpTransportClient::new(&chain, None).await.unwrap();

	let response = client
		.send_raw_request::<Value>("eth_blockNumber", None)
		.await
		.unwrap();

	assert_eq!(response["result"], "0x10");
	assert_eq!(client.get_current_url().await, fallback.url());
	primary_probe.assert();
	fallback_probe.assert();
	rate_limited.assert();
	served.assert();
}

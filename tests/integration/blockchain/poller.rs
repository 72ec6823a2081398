use alloy::primitives::{Address, B256};
use std::sync::Arc;

use chain_sentinel::{
	models::{EventKey, FilterQuery},
	services::blockchain::{ChainFetcher, ChainHeadSource, ChainPoller},
	utils::tests::builders::log::LogBuilder,
};

use crate::integration::mocks::MockChainClient;

fn query_for(address: u8, topic: u8) -> FilterQuery {
	FilterQuery::for_event(
		&EventKey::new(Address::with_last_byte(address), B256::with_last_byte(topic)),
		100,
		110,
	)
}

#[tokio::test]
async fn test_poll_runs_every_query_once() {
	let mut client = MockChainClient::new();
	client
		.expect_filter_logs()
		.withf(|query| query.from_block == 100 && query.to_block == 110)
		.times(2)
		.returning(|query| {
			Ok(vec![LogBuilder::new()
				.address(query.addresses[0])
				.topic(query.topics[0][0])
				.block_number(105)
				.build()])
		});

	let poller = ChainPoller::new(Arc::new(client));
	let logs = poller
		.poll(&[query_for(1, 10), query_for(2, 20)])
		.await
		.unwrap();

	assert_eq!(logs.len(), 2);
	assert_eq!(
		logs[0].event_key(),
		Some(EventKey::new(Address::with_last_byte(1), B256::with_last_byte(10)))
	);
	assert_eq!(
		logs[1].event_key(),
		Some(EventKey::new(Address::with_last_byte(2), B256::with_last_byte(20)))
	);
}

#[tokio::test]
async fn test_poll_fails_when_a_query_fails() {
	let mut client = MockChainClient::new();
	client
		.expect_filter_logs()
		.withf(|query| query.addresses[0] == Address::with_last_byte(1))
		.returning(|_| Ok(vec![]));
	client
		.expect_filter_logs()
		.withf(|query| query.addresses[0] == Address::with_last_byte(2))
		.returning(|_| Err(anyhow::anyhow!("rate limited")));

	let poller = ChainPoller::new(Arc::new(client));
	let err = poller
		.poll(&[query_for(1, 10), query_for(2, 20)])
		.await
		.unwrap_err();

	assert!(err.to_string().contains("Failed to filter logs for blocks 100 - 110"));
	assert!(format!("{:#}", err).contains("rate limited"));
}

#[tokio::test]
async fn test_head_source_uses_client() {
	let mut client = MockChainClient::new();
	client.expect_block_number().times(1).returning(|| Ok(42));

	let poller = ChainPoller::new(Arc::new(client));
	assert_eq!(ChainHeadSource::block_number(&poller).await.unwrap(), 42);
}

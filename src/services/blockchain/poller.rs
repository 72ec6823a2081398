//! Adapter turning a single-query client into the polling capabilities.

use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::{
	models::{FilterQuery, Log},
	services::blockchain::client::{BlockChainClient, ChainFetcher, ChainHeadSource},
};

/// Fans a cycle's queries out to a [`BlockChainClient`]
///
/// Queries run concurrently; results are concatenated in query order. Any
/// failing query fails the whole poll so that the caller retries the range
/// instead of skipping past logs it never saw.
#[derive(Clone)]
pub struct ChainPoller {
	client: Arc<dyn BlockChainClient>,
}

impl ChainPoller {
	pub fn new(client: Arc<dyn BlockChainClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl ChainFetcher for ChainPoller {
	#[instrument(skip_all, fields(queries = queries.len()))]
	async fn poll(&self, queries: &[FilterQuery]) -> Result<Vec<Log>, anyhow::Error> {
		let futures = queries.iter().map(|query| async move {
			self.client.filter_logs(query).await.with_context(|| {
				format!(
					"Failed to filter logs for blocks {} - {}",
					query.from_block, query.to_block
				)
			})
		});

		let results = futures::future::join_all(futures).await;

		let mut logs = Vec::new();
		for result in results {
			logs.extend(result?);
		}
		Ok(logs)
	}
}

#[async_trait]
impl ChainHeadSource for ChainPoller {
	async fn block_number(&self) -> Result<u64, anyhow::Error> {
		self.client.block_number().await
	}
}

//! Bootstrap module for building the sentinel from configuration.
//!
//! Loads chain configurations, connects an EVM client per chain, registers
//! every chain with a [`Sentinel`] and subscribes the event streams listed in
//! each configuration. Delivered logs are drained into structured log events
//! by one consumer task per subscription.

use futures::future::join_all;
use std::{error::Error, path::Path, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

use crate::{
	models::{ChainConfig, ConfigLoader},
	services::{
		blockchain::{BlockChainClient, EvmClient},
		sentinel::{AddChainConfig, Sentinel, SentinelError},
		subscription::LogSubscription,
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Loads every chain configuration in `path`, ordered by chain id
///
/// Uses `config/chains` when no path is given.
pub async fn load_chain_configs(path: Option<&Path>) -> Result<Vec<ChainConfig>> {
	let chains: Vec<(String, ChainConfig)> = ChainConfig::load_all(path).await?;
	let mut chains: Vec<ChainConfig> = chains.into_iter().map(|(_, chain)| chain).collect();
	chains.sort_by_key(|chain| chain.chain_id);
	Ok(chains)
}

/// Maps a chain configuration onto the sentinel's registration settings
pub fn create_add_chain_config(
	chain: &ChainConfig,
	client: Arc<dyn BlockChainClient>,
) -> AddChainConfig {
	AddChainConfig {
		fetch_timeout: Some(chain.fetch_timeout()),
		channel_capacity: Some(chain.channel_capacity),
		..AddChainConfig::with_client(chain.chain_id, chain.poll_interval(), client)
	}
}

/// Registers `chain` with the sentinel and subscribes its configured streams
///
/// # Errors
/// Fails when the chain cannot be added or a subscription is rejected. A
/// rejected subscription leaves the chain registered.
pub async fn register_chain(
	sentinel: &Sentinel,
	chain: &ChainConfig,
	client: Arc<dyn BlockChainClient>,
) -> std::result::Result<Vec<LogSubscription>, SentinelError> {
	sentinel
		.add_chain(create_add_chain_config(chain, client))
		.await?;

	let mut subscriptions = Vec::with_capacity(chain.subscriptions.len());
	for subscription in &chain.subscriptions {
		subscriptions.push(
			sentinel
				.subscribe(chain.chain_id, subscription.address, subscription.topic)
				.await?,
		);
	}

	info!(
		chain = %chain.slug,
		chain_id = chain.chain_id,
		subscriptions = subscriptions.len(),
		"Chain registered"
	);
	Ok(subscriptions)
}

/// Connects to the RPC endpoints of `chain`
///
/// A node reporting a different chain id than configured is only warned
/// about, the configured id stays authoritative.
pub async fn create_chain_client(chain: &ChainConfig) -> Result<Arc<dyn BlockChainClient>> {
	let client = EvmClient::new(chain).await?;

	match client.chain_id().await {
		Ok(reported) if reported != chain.chain_id => warn!(
			chain = %chain.slug,
			configured = chain.chain_id,
			reported,
			"RPC endpoint reports a different chain id"
		),
		Ok(_) => {}
		Err(e) => warn!(chain = %chain.slug, error = %e, "Failed to verify chain id"),
	}

	Ok(Arc::new(client))
}

/// Builds a sentinel polling every chain in `chains`
///
/// Chains whose endpoints cannot be reached or whose registration fails are
/// skipped with an error log, the remaining chains still start.
pub async fn initialize_sentinel(
	chains: &[ChainConfig],
) -> (Arc<Sentinel>, Vec<(String, LogSubscription)>) {
	let sentinel = Arc::new(Sentinel::new());
	let mut subscriptions = Vec::new();

	let clients = join_all(chains.iter().map(create_chain_client)).await;
	for (chain, client) in chains.iter().zip(clients) {
		let client = match client {
			Ok(client) => client,
			Err(e) => {
				error!(chain = %chain.slug, error = %e, "Failed to create chain client");
				continue;
			}
		};

		match register_chain(&sentinel, chain, client).await {
			Ok(chain_subscriptions) => subscriptions.extend(
				chain_subscriptions
					.into_iter()
					.map(|subscription| (chain.slug.clone(), subscription)),
			),
			Err(e) => error!(chain = %chain.slug, error = %e, "Failed to register chain"),
		}
	}

	(sentinel, subscriptions)
}

/// Drains `subscription` into `info` events until its queue is closed
///
/// The task runs in the caller's span.
pub fn spawn_log_consumer(chain_slug: String, mut subscription: LogSubscription) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(log) = subscription.recv().await {
			info!(
				chain = %chain_slug,
				subscription_id = %subscription.id,
				address = %log.address,
				topic = %subscription.key.topic,
				block_number = log.block_number,
				tx_hash = %log.tx_hash,
				log_index = log.index,
				data = %log.data,
				"Log received"
			);
		}
		info!(
			chain = %chain_slug,
			subscription_id = %subscription.id,
			"Subscription closed"
		);
	}
	.in_current_span())
}

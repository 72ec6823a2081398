//! Multi-chain orchestrator.
//!
//! Keeps one [`ChainPollerService`] per chain id and routes subscription
//! requests to the service of the requested chain. Chains are independent:
//! each has its own loop, registry and bookmark.

use alloy::primitives::{Address, B256};
use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::{
	services::{
		blockchain::{BlockChainClient, ChainFetcher, ChainHeadSource, ChainPoller},
		chain_poller::{ChainPollerService, ChainPollerServiceConfig, DEFAULT_FETCH_TIMEOUT},
		sentinel::error::SentinelError,
		subscription::{LogSubscription, SubscriptionId, DEFAULT_CHANNEL_CAPACITY},
	},
	utils::metrics::CHAINS_ACTIVE,
};

/// Everything needed to register a chain with the sentinel
///
/// Either `client` is set, in which case it is wrapped into both the fetcher
/// and the head source, or `fetcher` and `head_source` are given explicitly.
/// A set `client` takes precedence.
#[derive(Clone)]
pub struct AddChainConfig {
	pub chain_id: u64,
	pub poll_interval: Duration,
	pub fetch_timeout: Option<Duration>,
	pub channel_capacity: Option<usize>,
	pub client: Option<Arc<dyn BlockChainClient>>,
	pub fetcher: Option<Arc<dyn ChainFetcher>>,
	pub head_source: Option<Arc<dyn ChainHeadSource>>,
}

impl AddChainConfig {
	/// Config backed by a single client
	pub fn with_client(
		chain_id: u64,
		poll_interval: Duration,
		client: Arc<dyn BlockChainClient>,
	) -> Self {
		Self {
			chain_id,
			poll_interval,
			fetch_timeout: None,
			channel_capacity: None,
			client: Some(client),
			fetcher: None,
			head_source: None,
		}
	}

	/// Config backed by separate fetcher and head source capabilities
	pub fn with_capabilities(
		chain_id: u64,
		poll_interval: Duration,
		fetcher: Arc<dyn ChainFetcher>,
		head_source: Arc<dyn ChainHeadSource>,
	) -> Self {
		Self {
			chain_id,
			poll_interval,
			fetch_timeout: None,
			channel_capacity: None,
			client: None,
			fetcher: Some(fetcher),
			head_source: Some(head_source),
		}
	}

	fn into_service_config(self) -> ChainPollerServiceConfig {
		let (fetcher, head_source) = match self.client {
			Some(client) => {
				let poller = Arc::new(ChainPoller::new(client));
				(
					Some(poller.clone() as Arc<dyn ChainFetcher>),
					Some(poller as Arc<dyn ChainHeadSource>),
				)
			}
			None => (self.fetcher, self.head_source),
		};

		ChainPollerServiceConfig {
			chain_id: self.chain_id,
			poll_interval: self.poll_interval,
			fetch_timeout: self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT),
			channel_capacity: self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY),
			fetcher,
			head_source,
		}
	}
}

/// Orchestrates chain poller services keyed by chain id
#[derive(Default)]
pub struct Sentinel {
	services: RwLock<HashMap<u64, Arc<ChainPollerService>>>,
	// Only written while holding the `services` write lock
	closed: AtomicBool,
}

fn chain_metadata(chain_id: u64) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"chain_id".to_string(),
		chain_id.to_string(),
	)]))
}

impl Sentinel {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates, registers and starts a poller for a new chain
	///
	/// # Errors
	/// * `AlreadyExists` when the chain id is already registered
	/// * `ServiceError` when the poller cannot be created
	/// * `Closed` once [`Sentinel::close`] has been called
	#[instrument(skip_all, fields(chain_id = config.chain_id))]
	pub async fn add_chain(&self, config: AddChainConfig) -> Result<(), SentinelError> {
		let chain_id = config.chain_id;
		let already_exists = || {
			SentinelError::already_exists(
				"chain already registered",
				None,
				chain_metadata(chain_id),
			)
		};

		let closed = || SentinelError::closed("sentinel is closed", None, chain_metadata(chain_id));

		{
			let services = self.services.read().await;
			if self.closed.load(Ordering::Acquire) {
				return Err(closed());
			}
			if services.contains_key(&chain_id) {
				return Err(already_exists());
			}
		}

		// Built outside the lock, construction queries the chain head
		let service = Arc::new(ChainPollerService::new(config.into_service_config()).await?);

		{
			let mut services = self.services.write().await;
			let rejected = if self.closed.load(Ordering::Acquire) {
				Some(closed())
			} else if services.contains_key(&chain_id) {
				Some(already_exists())
			} else {
				None
			};
			if let Some(error) = rejected {
				drop(services);
				service.close().await;
				return Err(error);
			}
			services.insert(chain_id, service.clone());
			CHAINS_ACTIVE.inc();
		}

		service.start().await;
		info!(
			chain_id,
			last_processed_block = service.last_processed_block(),
			"Chain added"
		);
		Ok(())
	}

	/// Stops the poller of `chain_id` and closes all of its subscriptions
	///
	/// # Errors
	/// `NotFound` when the chain is not registered.
	#[instrument(skip(self))]
	pub async fn remove_chain(&self, chain_id: u64) -> Result<(), SentinelError> {
		let service = {
			let mut services = self.services.write().await;
			let service = services.remove(&chain_id).ok_or_else(|| {
				SentinelError::not_found("chain not found", None, chain_metadata(chain_id))
			})?;
			CHAINS_ACTIVE.dec();
			service
		};

		service.close().await;
		info!(chain_id, "Chain removed");
		Ok(())
	}

	/// Subscribes to logs of `(address, topic)` on `chain_id`
	pub async fn subscribe(
		&self,
		chain_id: u64,
		address: Address,
		topic: B256,
	) -> Result<LogSubscription, SentinelError> {
		let service = self.require_service(chain_id).await?;
		Ok(service
			.subscription_manager()
			.subscribe(address, topic)
			.await?)
	}

	/// Removes subscription `id` of `(address, topic)` on `chain_id`
	pub async fn unsubscribe(
		&self,
		chain_id: u64,
		address: Address,
		topic: B256,
		id: SubscriptionId,
	) -> Result<(), SentinelError> {
		let service = self.require_service(chain_id).await?;
		Ok(service
			.subscription_manager()
			.unsubscribe(address, topic, id)
			.await?)
	}

	pub async fn get_service(&self, chain_id: u64) -> Option<Arc<ChainPollerService>> {
		self.services.read().await.get(&chain_id).cloned()
	}

	pub async fn has_services(&self) -> bool {
		!self.services.read().await.is_empty()
	}

	/// Registered chain ids in ascending order
	pub async fn chain_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.services.read().await.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	/// Stops every poller and closes every subscription
	///
	/// Chains added afterwards, including by an `add_chain` already in
	/// flight, are rejected with `Closed`.
	pub async fn close(&self) {
		let services: Vec<(u64, Arc<ChainPollerService>)> = {
			let mut services = self.services.write().await;
			self.closed.store(true, Ordering::Release);
			CHAINS_ACTIVE.sub(services.len() as f64);
			services.drain().collect()
		};

		for (chain_id, service) in services {
			service.close().await;
			info!(chain_id, "Chain removed");
		}
		info!("Sentinel closed");
	}

	async fn require_service(
		&self,
		chain_id: u64,
	) -> Result<Arc<ChainPollerService>, SentinelError> {
		self.get_service(chain_id).await.ok_or_else(|| {
			SentinelError::not_found("chain not found", None, chain_metadata(chain_id))
		})
	}
}

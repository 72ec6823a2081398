//! Subscription registry implementation.
//!
//! Maps each [`EventKey`] to the delivery queues interested in it and keeps a
//! lazily rebuilt view of the addresses and topics currently subscribed. The
//! view is dropped on every mutation and rebuilt from the registry on the next
//! read, never patched in place.
//!
//! Delivery queues are bounded. Broadcasting never waits on a consumer: when a
//! queue is full the log is dropped for that subscriber only and a warning is
//! emitted, so a stalled consumer cannot hold up the poll loop or its peers.

use alloy::primitives::{Address, B256};
use std::{
	collections::HashMap,
	fmt,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};
use tokio::sync::{
	mpsc::{self, error::TrySendError},
	RwLock,
};
use tracing::{debug, info, warn};

use crate::{
	models::{EventKey, Log},
	services::subscription::error::SubscriptionError,
	utils::metrics::{LOGS_DELIVERED, LOGS_DROPPED, SUBSCRIBERS},
};

/// Default capacity of each subscriber's delivery queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Interest view: every subscribed address with its distinct topics
pub type AddressTopics = HashMap<Address, Vec<B256>>;

/// Source of subscription ids, shared by every manager in the process
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one subscriber queue
///
/// Ids are unique across all chains, so an id issued by one chain's manager
/// never matches a subscriber of another chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
	fn next() -> Self {
		Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Receiving half of a subscription.
///
/// The queue yields `None` once the subscription is removed or the manager
/// that issued it is closed.
#[derive(Debug)]
pub struct LogSubscription {
	pub id: SubscriptionId,
	pub key: EventKey,
	pub receiver: mpsc::Receiver<Log>,
}

impl LogSubscription {
	/// Waits for the next log, `None` when the queue has been closed
	pub async fn recv(&mut self) -> Option<Log> {
		self.receiver.recv().await
	}
}

struct Subscriber {
	id: SubscriptionId,
	sender: mpsc::Sender<Log>,
}

#[derive(Default)]
struct Registry {
	subscribers: HashMap<EventKey, Vec<Subscriber>>,
	closed: bool,
}

impl Registry {
	fn total(&self) -> usize {
		self.subscribers.values().map(Vec::len).sum()
	}
}

/// Thread-safe registry of subscribers for a single chain
pub struct SubscriptionManager {
	chain_id: u64,
	channel_capacity: usize,
	registry: RwLock<Registry>,
	// Lock order: registry, then cache
	cache: RwLock<Option<Arc<AddressTopics>>>,
}

impl SubscriptionManager {
	/// Creates an empty registry whose queues hold up to `channel_capacity` logs
	///
	/// A capacity of zero is raised to one, since bounded queues need room for
	/// at least one message.
	pub fn new(chain_id: u64, channel_capacity: usize) -> Self {
		Self {
			chain_id,
			channel_capacity: channel_capacity.max(1),
			registry: RwLock::new(Registry::default()),
			cache: RwLock::new(None),
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Registers a new delivery queue for `(address, topic)`
	///
	/// # Errors
	/// `InvalidArgument` when the address or topic is zero, or the manager has
	/// been closed.
	pub async fn subscribe(
		&self,
		address: Address,
		topic: B256,
	) -> Result<LogSubscription, SubscriptionError> {
		if address.is_zero() {
			return Err(SubscriptionError::invalid_argument(
				"address cannot be empty",
				None,
				None,
			));
		}
		if topic.is_zero() {
			return Err(SubscriptionError::invalid_argument(
				"topic cannot be empty",
				None,
				Some(HashMap::from([(
					"address".to_string(),
					address.to_string(),
				)])),
			));
		}

		let key = EventKey::new(address, topic);
		let mut registry = self.registry.write().await;
		if registry.closed {
			return Err(SubscriptionError::invalid_argument(
				"subscription manager is closed",
				None,
				Some(HashMap::from([(
					"chain_id".to_string(),
					self.chain_id.to_string(),
				)])),
			));
		}

		let id = SubscriptionId::next();
		let (sender, receiver) = mpsc::channel(self.channel_capacity);
		let entry = registry.subscribers.entry(key).or_default();
		entry.push(Subscriber { id, sender });
		let key_subscribers = entry.len();

		self.invalidate_cache().await;
		self.record_subscribers(registry.total());

		info!(
			chain_id = self.chain_id,
			%address,
			%topic,
			subscription_id = %id,
			subscribers = key_subscribers,
			"Subscription added"
		);

		Ok(LogSubscription { id, key, receiver })
	}

	/// Removes the subscriber `id` from `(address, topic)` and closes its queue
	///
	/// # Errors
	/// `NotFound` when nothing is registered under the key or `id` is not one
	/// of its subscribers. Removing the same subscription twice fails.
	pub async fn unsubscribe(
		&self,
		address: Address,
		topic: B256,
		id: SubscriptionId,
	) -> Result<(), SubscriptionError> {
		let key = EventKey::new(address, topic);
		let metadata = || {
			HashMap::from([
				("address".to_string(), address.to_string()),
				("topic".to_string(), topic.to_string()),
				("subscription_id".to_string(), id.to_string()),
			])
		};

		let mut registry = self.registry.write().await;
		let subscribers = registry.subscribers.get_mut(&key).ok_or_else(|| {
			SubscriptionError::not_found("event key does not exist", None, Some(metadata()))
		})?;

		let position = subscribers
			.iter()
			.position(|subscriber| subscriber.id == id)
			.ok_or_else(|| {
				SubscriptionError::not_found("subscriber not found", None, Some(metadata()))
			})?;

		subscribers.remove(position);
		let remaining = subscribers.len();
		if remaining == 0 {
			registry.subscribers.remove(&key);
		}

		self.invalidate_cache().await;
		self.record_subscribers(registry.total());

		info!(
			chain_id = self.chain_id,
			%address,
			%topic,
			subscription_id = %id,
			subscribers = remaining,
			"Subscription removed"
		);

		Ok(())
	}

	/// Delivers `log` to every subscriber currently registered under `key`
	///
	/// Returns the number of queues that accepted the log.
	pub async fn broadcast_log(&self, key: &EventKey, log: &Log) -> usize {
		let registry = self.registry.read().await;
		if registry.closed {
			return 0;
		}

		let Some(subscribers) = registry.subscribers.get(key) else {
			return 0;
		};

		let chain_label = self.chain_id.to_string();
		let mut delivered = 0;
		for subscriber in subscribers {
			match subscriber.sender.try_send(log.clone()) {
				Ok(()) => delivered += 1,
				Err(TrySendError::Full(_)) => {
					LOGS_DROPPED.with_label_values(&[&chain_label]).inc();
					warn!(
						chain_id = self.chain_id,
						subscription_id = %subscriber.id,
						%key,
						block_number = log.block_number,
						"Subscriber queue is full, dropping log"
					);
				}
				Err(TrySendError::Closed(_)) => {
					debug!(
						chain_id = self.chain_id,
						subscription_id = %subscriber.id,
						"Subscriber queue is closed, skipping"
					);
				}
			}
		}

		LOGS_DELIVERED
			.with_label_values(&[&chain_label])
			.inc_by(delivered as u64);
		delivered
	}

	/// Returns the addresses and topics currently subscribed
	///
	/// The view is cached until the next subscribe, unsubscribe or close.
	pub async fn get_addresses_and_topics(&self) -> Arc<AddressTopics> {
		if let Some(cached) = self.cache.read().await.as_ref() {
			return cached.clone();
		}

		let registry = self.registry.read().await;
		// Another reader may have rebuilt the view while we waited
		if let Some(cached) = self.cache.read().await.as_ref() {
			return cached.clone();
		}

		let mut view: AddressTopics = HashMap::new();
		for key in registry.subscribers.keys() {
			let topics = view.entry(key.address).or_default();
			if !topics.contains(&key.topic) {
				topics.push(key.topic);
			}
		}
		for topics in view.values_mut() {
			topics.sort();
		}

		let view = Arc::new(view);
		*self.cache.write().await = Some(view.clone());
		debug!(
			chain_id = self.chain_id,
			addresses = view.len(),
			"Rebuilt address and topic cache"
		);
		view
	}

	/// Number of subscribers registered under `key`
	pub async fn subscriber_count(&self, key: &EventKey) -> usize {
		self.registry
			.read()
			.await
			.subscribers
			.get(key)
			.map_or(0, Vec::len)
	}

	/// Number of subscribers across all keys
	pub async fn total_subscribers(&self) -> usize {
		self.registry.read().await.total()
	}

	/// Closes every delivery queue and empties the registry
	///
	/// Later broadcasts are ignored and later subscriptions are rejected.
	/// Closing more than once has no further effect.
	pub async fn close(&self) {
		let mut registry = self.registry.write().await;
		if registry.closed {
			return;
		}

		let closed_queues = registry.total();
		registry.closed = true;
		registry.subscribers.clear();

		self.invalidate_cache().await;
		self.record_subscribers(0);

		info!(
			chain_id = self.chain_id,
			closed_queues, "Subscription manager closed"
		);
	}

	pub async fn is_closed(&self) -> bool {
		self.registry.read().await.closed
	}

	// Callers must hold the registry write lock
	async fn invalidate_cache(&self) {
		*self.cache.write().await = None;
		debug!(chain_id = self.chain_id, "Address and topic cache invalidated");
	}

	fn record_subscribers(&self, total: usize) {
		SUBSCRIBERS
			.with_label_values(&[&self.chain_id.to_string()])
			.set(total as f64);
	}
}

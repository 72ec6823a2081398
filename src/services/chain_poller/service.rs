//! Chain poller service implementation.
//!
//! Runs one polling loop per chain. Each cycle reads the current head, asks
//! the subscription manager what is of interest, fetches the matching logs for
//! the blocks after the bookmark and broadcasts them to subscribers. The
//! bookmark only moves forward, and only after a cycle has fully succeeded or
//! found nothing to fetch.

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::{
	sync::{watch, Mutex},
	task::JoinHandle,
	time::{interval_at, timeout, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	models::{EventKey, FilterQuery},
	services::{
		blockchain::{ChainFetcher, ChainHeadSource},
		chain_poller::error::ChainPollerServiceError,
		subscription::{SubscriptionManager, DEFAULT_CHANNEL_CAPACITY},
	},
	utils::metrics::{LAST_PROCESSED_BLOCK, LOGS_FETCHED, POLL_CYCLES, POLL_ERRORS},
};

/// Upper bound for a single head query or log fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings and collaborators for one chain
#[derive(Clone)]
pub struct ChainPollerServiceConfig {
	pub chain_id: u64,
	pub poll_interval: Duration,
	pub fetch_timeout: Duration,
	pub channel_capacity: usize,
	pub fetcher: Option<Arc<dyn ChainFetcher>>,
	pub head_source: Option<Arc<dyn ChainHeadSource>>,
}

impl Default for ChainPollerServiceConfig {
	fn default() -> Self {
		Self {
			chain_id: 0,
			poll_interval: Duration::ZERO,
			fetch_timeout: DEFAULT_FETCH_TIMEOUT,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
			fetcher: None,
			head_source: None,
		}
	}
}

/// What a single poll cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
	/// The head query failed or timed out
	HeadUnavailable,
	/// The head is not past the bookmark
	HeadNotAdvanced,
	/// Nobody is subscribed, the bookmark moved to the head without fetching
	NoSubscriptions,
	/// The fetch failed or timed out, the range will be retried
	FetchFailed,
	/// Logs were fetched and broadcast, the bookmark moved to the head
	Completed { logs: usize },
}

struct PollerState {
	chain_id: u64,
	poll_interval: Duration,
	fetch_timeout: Duration,
	fetcher: Arc<dyn ChainFetcher>,
	head_source: Arc<dyn ChainHeadSource>,
	subscription_manager: Arc<SubscriptionManager>,
	last_processed_block: AtomicU64,
	// Held for a whole cycle, one cycle at a time per chain
	cycle: Mutex<()>,
}

struct RunningLoop {
	shutdown_tx: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

/// Polling loop and subscription registry for a single chain
///
/// Dropping the service drops the stop signal, which ends a running loop
/// after its current cycle.
pub struct ChainPollerService {
	state: Arc<PollerState>,
	running: Mutex<Option<RunningLoop>>,
}

impl ChainPollerService {
	/// Validates `config` and reads the initial head
	///
	/// The bookmark starts one block below the head, so the first cycle
	/// fetches from the head observed here.
	///
	/// # Errors
	/// * `InvalidArgument` for a missing fetcher or head source, a zero poll
	///   interval or an unset chain id
	/// * `InitializationError` when the head cannot be read or is 0
	pub async fn new(config: ChainPollerServiceConfig) -> Result<Self, ChainPollerServiceError> {
		let fetcher = config.fetcher.ok_or_else(|| {
			ChainPollerServiceError::invalid_argument("chain fetcher cannot be nil", None, None)
		})?;
		let head_source = config.head_source.ok_or_else(|| {
			ChainPollerServiceError::invalid_argument("chain head source cannot be nil", None, None)
		})?;
		if config.poll_interval.is_zero() {
			return Err(ChainPollerServiceError::invalid_argument(
				"poll interval must be positive",
				None,
				None,
			));
		}
		if config.chain_id == 0 {
			return Err(ChainPollerServiceError::invalid_argument(
				"chain id not set",
				None,
				None,
			));
		}

		let metadata = || {
			HashMap::from([("chain_id".to_string(), config.chain_id.to_string())])
		};
		let head = match timeout(config.fetch_timeout, head_source.block_number()).await {
			Ok(Ok(head)) => head,
			Ok(Err(e)) => {
				return Err(ChainPollerServiceError::initialization_error(
					"failed to get initial block number",
					Some(e.into()),
					Some(metadata()),
				));
			}
			Err(e) => {
				return Err(ChainPollerServiceError::initialization_error(
					"timed out getting initial block number",
					Some(Box::new(e)),
					Some(metadata()),
				));
			}
		};
		if head == 0 {
			return Err(ChainPollerServiceError::initialization_error(
				"blockchain has no blocks",
				None,
				Some(metadata()),
			));
		}

		let state = PollerState {
			chain_id: config.chain_id,
			poll_interval: config.poll_interval,
			fetch_timeout: config.fetch_timeout,
			fetcher,
			head_source,
			subscription_manager: Arc::new(SubscriptionManager::new(
				config.chain_id,
				config.channel_capacity,
			)),
			last_processed_block: AtomicU64::new(head - 1),
			cycle: Mutex::new(()),
		};
		state.record_bookmark(head - 1);

		debug!(
			chain_id = config.chain_id,
			head, "Chain poller service created"
		);

		Ok(Self {
			state: Arc::new(state),
			running: Mutex::new(None),
		})
	}

	pub fn chain_id(&self) -> u64 {
		self.state.chain_id
	}

	pub fn poll_interval(&self) -> Duration {
		self.state.poll_interval
	}

	/// Highest block incorporated into a completed cycle
	pub fn last_processed_block(&self) -> u64 {
		self.state.last_processed_block.load(Ordering::Acquire)
	}

	pub fn subscription_manager(&self) -> &Arc<SubscriptionManager> {
		&self.state.subscription_manager
	}

	pub async fn is_running(&self) -> bool {
		self.running.lock().await.is_some()
	}

	/// Spawns the polling loop
	///
	/// The first cycle runs one interval after start. Calling start on a
	/// running service logs a warning and does nothing else.
	pub async fn start(&self) {
		let mut running = self.running.lock().await;
		if running.is_some() {
			warn!(
				chain_id = self.state.chain_id,
				"Chain poller already running"
			);
			return;
		}

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let handle = tokio::spawn(run_loop(self.state.clone(), shutdown_rx));
		*running = Some(RunningLoop {
			shutdown_tx,
			handle,
		});

		info!(
			chain_id = self.state.chain_id,
			poll_interval_ms = self.state.poll_interval.as_millis() as u64,
			last_processed_block = self.last_processed_block(),
			"Chain poller started"
		);
	}

	/// Signals the loop to exit and waits for it to finish its current cycle
	///
	/// Does nothing, and logs nothing, when the service is not running.
	pub async fn stop(&self) {
		let mut running = self.running.lock().await;
		let Some(RunningLoop {
			shutdown_tx,
			handle,
		}) = running.take()
		else {
			return;
		};

		let _ = shutdown_tx.send(true);
		if let Err(e) = handle.await {
			if e.is_panic() {
				error!(chain_id = self.state.chain_id, error = %e, "Chain poller loop panicked");
			}
		}

		info!(chain_id = self.state.chain_id, "Chain poller stopped");
	}

	/// Stops the loop and closes every subscription of this chain
	pub async fn close(&self) {
		self.stop().await;
		self.state.subscription_manager.close().await;
	}

	/// Runs a single poll cycle outside the loop
	///
	/// Waits for a cycle already in progress, from the loop or another
	/// caller, to finish first.
	pub async fn poll_once(&self) -> PollOutcome {
		self.state.poll_cycle().await
	}
}

async fn run_loop(state: Arc<PollerState>, mut shutdown_rx: watch::Receiver<bool>) {
	let mut interval = interval_at(Instant::now() + state.poll_interval, state.poll_interval);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			biased;
			// Also fires when the sender is dropped
			_ = shutdown_rx.changed() => break,
			_ = interval.tick() => {
				state.poll_cycle().await;
			}
		}
	}

	debug!(chain_id = state.chain_id, "Chain poller loop exited");
}

impl PollerState {
	#[instrument(skip_all, fields(chain_id = self.chain_id))]
	async fn poll_cycle(&self) -> PollOutcome {
		let _cycle = self.cycle.lock().await;
		let chain_label = self.chain_id.to_string();

		let head = match timeout(self.fetch_timeout, self.head_source.block_number()).await {
			Ok(Ok(head)) => head,
			Ok(Err(e)) => {
				POLL_ERRORS.with_label_values(&[&chain_label]).inc();
				error!(error = ?e, "Failed to get latest block number, skipping cycle");
				return PollOutcome::HeadUnavailable;
			}
			Err(_) => {
				POLL_ERRORS.with_label_values(&[&chain_label]).inc();
				error!(
					timeout_ms = self.fetch_timeout.as_millis() as u64,
					"Timed out getting latest block number, skipping cycle"
				);
				return PollOutcome::HeadUnavailable;
			}
		};

		let from_block = self.last_processed_block.load(Ordering::Acquire) + 1;
		if from_block > head {
			debug!(head, from_block, "Head has not advanced, skipping cycle");
			return PollOutcome::HeadNotAdvanced;
		}

		let interest = self.subscription_manager.get_addresses_and_topics().await;
		if interest.is_empty() {
			debug!(head, "No active subscriptions, skipping fetch");
			self.advance(head);
			return PollOutcome::NoSubscriptions;
		}

		let mut keys: Vec<EventKey> = interest
			.iter()
			.flat_map(|(address, topics)| {
				topics.iter().map(move |topic| EventKey::new(*address, *topic))
			})
			.collect();
		keys.sort();
		let queries: Vec<FilterQuery> = keys
			.iter()
			.map(|key| FilterQuery::for_event(key, from_block, head))
			.collect();

		debug!(
			from_block,
			to_block = head,
			queries = queries.len(),
			"Polling for logs"
		);

		let logs = match timeout(self.fetch_timeout, self.fetcher.poll(&queries)).await {
			Ok(Ok(logs)) => logs,
			Ok(Err(e)) => {
				POLL_ERRORS.with_label_values(&[&chain_label]).inc();
				error!(error = ?e, from_block, to_block = head, "Failed to fetch logs, range will be retried");
				return PollOutcome::FetchFailed;
			}
			Err(_) => {
				POLL_ERRORS.with_label_values(&[&chain_label]).inc();
				error!(
					from_block,
					to_block = head,
					timeout_ms = self.fetch_timeout.as_millis() as u64,
					"Timed out fetching logs, range will be retried"
				);
				return PollOutcome::FetchFailed;
			}
		};

		LOGS_FETCHED
			.with_label_values(&[&chain_label])
			.inc_by(logs.len() as u64);

		for log in &logs {
			match log.event_key() {
				Some(key) => {
					self.subscription_manager.broadcast_log(&key, log).await;
				}
				None => debug!(
					address = %log.address,
					tx_hash = %log.tx_hash,
					"Skipping log without topics"
				),
			}
		}

		self.advance(head);
		POLL_CYCLES.with_label_values(&[&chain_label]).inc();

		debug!(
			from_block,
			to_block = head,
			logs = logs.len(),
			"Poll cycle complete"
		);
		PollOutcome::Completed { logs: logs.len() }
	}

	fn advance(&self, head: u64) {
		// fetch_max keeps the bookmark monotonic
		self.last_processed_block
			.fetch_max(head, Ordering::AcqRel);
		self.record_bookmark(self.last_processed_block.load(Ordering::Acquire));
	}

	fn record_bookmark(&self, block: u64) {
		LAST_PROCESSED_BLOCK
			.with_label_values(&[&self.chain_id.to_string()])
			.set(block as f64);
	}
}

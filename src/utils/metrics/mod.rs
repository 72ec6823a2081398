//! Metrics module for the application.
//!
//! - This module contains the global Prometheus registry.
//! - Defines specific metrics for the sentinel, labelled by chain id.

pub mod server;
use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
	/// Global Prometheus registry.
	///
	/// This registry holds all metrics defined in this module and is used
	/// to gather metrics for exposure via the metrics endpoint.
	pub static ref REGISTRY: Registry = Registry::new();

	/// Gauge for the number of chains registered with the sentinel.
	pub static ref CHAINS_ACTIVE: Gauge = {
		let gauge = Gauge::new("sentinel_chains_active", "Number of chains being polled").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge Vector for live subscribers per chain.
	pub static ref SUBSCRIBERS: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("sentinel_subscribers", "Number of live subscribers per chain"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge Vector for the poll bookmark of each chain.
	pub static ref LAST_PROCESSED_BLOCK: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("sentinel_last_processed_block", "Highest block incorporated into a completed poll cycle"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Counter Vector for poll cycles that ran to completion.
	pub static ref POLL_CYCLES: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("sentinel_poll_cycles_total", "Number of completed poll cycles"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Counter Vector for failed head queries and fetches.
	pub static ref POLL_ERRORS: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("sentinel_poll_errors_total", "Number of poll cycles aborted by an error"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Counter Vector for logs returned by the fetcher.
	pub static ref LOGS_FETCHED: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("sentinel_logs_fetched_total", "Number of logs returned by the chain fetcher"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Counter Vector for logs handed to a subscriber queue.
	pub static ref LOGS_DELIVERED: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("sentinel_logs_delivered_total", "Number of logs delivered to subscriber queues"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Counter Vector for logs dropped because a subscriber queue was full.
	pub static ref LOGS_DROPPED: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("sentinel_logs_dropped_total", "Number of logs dropped on full subscriber queues"),
			&["chain_id"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};
}

#[cfg(test)]
lazy_static! {
	/// Serializes tests that reset or snapshot the global metrics
	pub(crate) static ref METRICS_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}

/// Gather all metrics and encode into the provided format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let encoder = TextEncoder::new();
	let metric_families = REGISTRY.gather();
	let mut buffer = Vec::new();
	encoder.encode(&metric_families, &mut buffer)?;
	Ok(buffer)
}

/// Updates the per-chain gauges from a snapshot of the sentinel.
///
/// `sentinel_chains_active` is left alone, sentinels adjust it as chains
/// come and go.
///
/// # Arguments
/// * `chains` - Tuples of (chain id, subscriber count, last processed block)
pub fn update_sentinel_metrics(chains: &[(u64, usize, u64)]) {
	SUBSCRIBERS.reset();
	LAST_PROCESSED_BLOCK.reset();
	for (chain_id, subscribers, last_processed_block) in chains {
		let label = chain_id.to_string();
		SUBSCRIBERS
			.with_label_values(&[&label])
			.set(*subscribers as f64);
		LAST_PROCESSED_BLOCK
			.with_label_values(&[&label])
			.set(*last_processed_block as f64);
	}
}

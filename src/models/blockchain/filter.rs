//! Event keys and log filter queries.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one subscribable stream of logs: an emitting contract and the
/// event signature topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
	pub address: Address,
	pub topic: B256,
}

impl EventKey {
	pub fn new(address: Address, topic: B256) -> Self {
		Self { address, topic }
	}
}

impl fmt::Display for EventKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.address, self.topic)
	}
}

/// Block range query for logs emitted by a set of addresses.
///
/// `topics` follows the `eth_getLogs` convention: position `i` holds the
/// accepted values for topic `i`, an empty group matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
	pub from_block: u64,
	pub to_block: u64,
	pub addresses: Vec<Address>,
	pub topics: Vec<Vec<B256>>,
}

impl FilterQuery {
	/// Builds the query for a single event key over `[from_block, to_block]`.
	pub fn for_event(key: &EventKey, from_block: u64, to_block: u64) -> Self {
		Self {
			from_block,
			to_block,
			addresses: vec![key.address],
			topics: vec![vec![key.topic]],
		}
	}

	/// Number of blocks covered by the query, inclusive on both ends.
	pub fn block_span(&self) -> u64 {
		self.to_block
			.checked_sub(self.from_block)
			.map_or(0, |span| span + 1)
	}
}

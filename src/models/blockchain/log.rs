//! Event log record.

use alloy::{
	primitives::{Address, Bytes, B256},
	rpc::types::Log as AlloyRpcLog,
};
use serde::{Deserialize, Serialize};

use crate::models::EventKey;

/// A single event record emitted on chain.
///
/// The first topic is conventionally the event signature hash and is what
/// subscriptions are keyed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
	pub block_number: u64,
	pub tx_hash: B256,
	pub index: u64,
}

impl Log {
	/// Routing key for this log, `None` when the log carries no topics.
	pub fn event_key(&self) -> Option<EventKey> {
		self.topics
			.first()
			.map(|topic| EventKey::new(self.address, *topic))
	}
}

impl From<AlloyRpcLog> for Log {
	fn from(log: AlloyRpcLog) -> Self {
		Self {
			address: log.inner.address,
			topics: log.inner.topics().to_vec(),
			data: log.inner.data.data.clone(),
			block_number: log.block_number.unwrap_or_default(),
			tx_hash: log.transaction_hash.unwrap_or_default(),
			index: log.log_index.unwrap_or_default(),
		}
	}
}

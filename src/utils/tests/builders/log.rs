//! Test helper utilities for event logs
//!
//! - `LogBuilder`: Builder for creating test Log instances

use alloy::primitives::{Address, Bytes, B256};

use crate::models::Log;

/// Builder for creating test Log instances
#[derive(Default)]
pub struct LogBuilder {
	address: Address,
	topics: Vec<B256>,
	data: Bytes,
	block_number: u64,
	tx_hash: B256,
	index: u64,
}

impl LogBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn address(mut self, address: Address) -> Self {
		self.address = address;
		self
	}

	pub fn topic(mut self, topic: B256) -> Self {
		self.topics.push(topic);
		self
	}

	pub fn topics(mut self, topics: Vec<B256>) -> Self {
		self.topics = topics;
		self
	}

	pub fn data(mut self, data: impl Into<Bytes>) -> Self {
		self.data = data.into();
		self
	}

	pub fn block_number(mut self, block_number: u64) -> Self {
		self.block_number = block_number;
		self
	}

	pub fn tx_hash(mut self, tx_hash: B256) -> Self {
		self.tx_hash = tx_hash;
		self
	}

	pub fn index(mut self, index: u64) -> Self {
		self.index = index;
		self
	}

	pub fn build(self) -> Log {
		Log {
			address: self.address,
			topics: self.topics,
			data: self.data,
			block_number: self.block_number,
			tx_hash: self.tx_hash,
			index: self.index,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_log() {
		let log = LogBuilder::new().build();

		assert_eq!(log.address, Address::ZERO);
		assert!(log.topics.is_empty());
		assert!(log.data.is_empty());
		assert_eq!(log.block_number, 0);
	}

	#[test]
	fn test_builder_methods() {
		let log = LogBuilder::new()
			.address(Address::with_last_byte(1))
			.topic(B256::with_last_byte(2))
			.topic(B256::with_last_byte(3))
			.data(vec![0xca, 0xfe])
			.block_number(42)
			.tx_hash(B256::with_last_byte(4))
			.index(7)
			.build();

		assert_eq!(log.topics, vec![B256::with_last_byte(2), B256::with_last_byte(3)]);
		assert_eq!(log.data, Bytes::from(vec![0xca, 0xfe]));
		assert_eq!(log.block_number, 42);
		assert_eq!(log.index, 7);
	}
}

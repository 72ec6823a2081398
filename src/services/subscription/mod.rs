//! Per-chain subscription registry.
//!
//! - `SubscriptionManager`: maps (address, topic) keys to bounded delivery queues
//! - `LogSubscription`: the receiving half handed to subscribers
//! - `SubscriptionError`: errors returned by registry operations

mod error;
mod manager;

pub use error::SubscriptionError;
pub use manager::{
	AddressTopics, LogSubscription, SubscriptionId, SubscriptionManager, DEFAULT_CHANNEL_CAPACITY,
};

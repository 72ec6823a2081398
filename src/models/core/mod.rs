//! Core domain models.
//!
//! - Chains: which ledgers to poll, how often, and what to subscribe to

mod chain;

pub use chain::{ChainConfig, EventSubscription, RpcUrl};

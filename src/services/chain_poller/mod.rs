//! Per-chain polling of event logs.
//!
//! A [`ChainPollerService`] owns the subscription registry for one chain and a
//! background loop that fetches logs for new blocks and fans them out to
//! subscribers.

mod error;
mod service;

pub use error::ChainPollerServiceError;
pub use service::{
	ChainPollerService, ChainPollerServiceConfig, PollOutcome, DEFAULT_FETCH_TIMEOUT,
};

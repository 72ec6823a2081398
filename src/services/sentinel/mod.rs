//! Multi-chain orchestration.
//!
//! The [`Sentinel`] owns one chain poller service per registered chain and
//! delegates subscription requests to it.

mod error;
mod service;

pub use error::SentinelError;
pub use service::{AddChainConfig, Sentinel};

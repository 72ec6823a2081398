//! Blockchain client interfaces and implementations.
//!
//! Provides the capabilities the polling core consumes and a concrete adapter
//! for EVM nodes:
//!
//! - Capability traits (`BlockChainClient`, `ChainFetcher`, `ChainHeadSource`)
//! - `ChainPoller`, adapting a client into a fetcher and head source
//! - EVM JSON-RPC client
//! - HTTP transport with retries and endpoint rotation
//! - Error handling for blockchain operations

mod client;
mod clients;
mod error;
mod poller;
mod transports;

pub use client::{BlockChainClient, ChainFetcher, ChainHeadSource};
pub use clients::EvmClient;
pub use error::BlockChainError;
pub use poller::ChainPoller;
pub use transports::{
	BlockchainTransport, EndpointManager, HttpTransportClient, RotatingTransport,
	TransientErrorRetryStrategy, TransportError, ROTATE_ON_ERROR_CODES,
};

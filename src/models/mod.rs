//! Domain models and data structures for the sentinel.
//!
//! This module contains the core data structures used throughout the application:
//!
//! - `blockchain`: Event keys, filter queries and log records
//! - `config`: Configuration loading and validation
//! - `core`: Core domain models (ChainConfig)

mod blockchain;
mod config;
mod core;

// Re-export blockchain types
pub use blockchain::{EventKey, FilterQuery, Log};

// Re-export core types
pub use core::{ChainConfig, EventSubscription, RpcUrl};

// Re-export config types
pub use config::{ConfigError, ConfigLoader};

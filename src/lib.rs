//! Multi-chain event log subscription and polling service.
//!
//! The sentinel polls one or more chains for new event logs and fans matching
//! logs out to subscribers with at most one poll cycle of latency. It includes:
//!
//! - A thread-safe subscription registry per chain with a lazily rebuilt
//!   address/topic view
//! - A polling loop per chain that tracks the last processed block and retries
//!   failed block ranges
//! - An orchestrator that adds and removes chains at runtime
//! - An EVM JSON-RPC client with retries and endpoint failover
//!
//! Delivery queues are bounded and never block the poll loop: when a
//! subscriber falls behind and its queue is full, logs are dropped for that
//! subscriber only and counted in `sentinel_logs_dropped_total`.
//!
//! # Module Structure
//!
//! - `bootstrap`: Builds a sentinel from chain configuration files
//! - `models`: Chain data and configuration types
//! - `services`: Subscriptions, polling, orchestration and chain access
//! - `utils`: Logging, metrics, HTTP and test helpers

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;

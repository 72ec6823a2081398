//! Utility modules for common functionality.
//!
//! - http: Retrying HTTP client construction and retry settings
//! - logging: Logging setup and structured error context
//! - metrics: Prometheus metrics and the metrics server
//! - parsing: Parsing helpers for CLI and configuration values
//! - tests: Test builders and helpers

pub mod http;
pub mod logging;
pub mod metrics;
pub mod parsing;
pub mod tests;

pub use http::*;
pub use parsing::*;

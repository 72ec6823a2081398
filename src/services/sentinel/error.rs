//! Sentinel error types and handling.
//!
//! Wraps the errors of the per-chain services so callers of the orchestrator
//! deal with a single type.

use crate::{
	services::{chain_poller::ChainPollerServiceError, subscription::SubscriptionError},
	utils::logging::error::{ErrorContext, TraceableError},
};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors returned by the sentinel
#[derive(ThisError, Debug)]
pub enum SentinelError {
	/// A chain with the same id is already registered
	#[error("Already exists: {0}")]
	AlreadyExists(ErrorContext),

	/// No chain is registered under the given id
	#[error("Not found: {0}")]
	NotFound(ErrorContext),

	/// The sentinel has been closed and accepts no new chains
	#[error("Closed: {0}")]
	Closed(ErrorContext),

	/// The chain poller service could not be created
	#[error("Service error: {0}")]
	ServiceError(#[from] ChainPollerServiceError),

	/// The subscription registry rejected the request
	#[error("Subscription error: {0}")]
	SubscriptionError(#[from] SubscriptionError),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl SentinelError {
	// Already exists error
	pub fn already_exists(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::AlreadyExists(ErrorContext::new(msg, source, metadata))
	}

	// Not found error
	pub fn not_found(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::NotFound(ErrorContext::new(msg, source, metadata))
	}

	// Closed error
	pub fn closed(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::Closed(ErrorContext::new(msg, source, metadata))
	}
}

impl TraceableError for SentinelError {
	fn trace_id(&self) -> String {
		match self {
			Self::AlreadyExists(ctx) => ctx.trace_id.clone(),
			Self::NotFound(ctx) => ctx.trace_id.clone(),
			Self::Closed(ctx) => ctx.trace_id.clone(),
			Self::ServiceError(e) => e.trace_id(),
			Self::SubscriptionError(e) => e.trace_id(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}

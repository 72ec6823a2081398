//! Subscription error types and handling.
//!
//! Errors returned synchronously to callers of the subscription registry.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors that can occur while managing subscriptions
#[derive(ThisError, Debug)]
pub enum SubscriptionError {
	/// Zero address or topic, or a registry that has already been closed
	#[error("Invalid argument: {0}")]
	InvalidArgument(ErrorContext),

	/// The event key or the subscriber is not registered
	#[error("Not found: {0}")]
	NotFound(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl SubscriptionError {
	// Invalid argument error
	pub fn invalid_argument(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		// Not logged here, the caller decides how to report misuse
		Self::InvalidArgument(ErrorContext::new(msg, source, metadata))
	}

	// Not found error
	pub fn not_found(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::NotFound(ErrorContext::new(msg, source, metadata))
	}
}

impl TraceableError for SubscriptionError {
	fn trace_id(&self) -> String {
		match self {
			Self::InvalidArgument(ctx) => ctx.trace_id.clone(),
			Self::NotFound(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}

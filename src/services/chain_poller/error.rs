//! Chain poller service error types and handling.
//!
//! Only construction can fail; errors inside the polling loop are logged and
//! the cycle is retried on the next tick.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors that can occur while creating a chain poller service
#[derive(ThisError, Debug)]
pub enum ChainPollerServiceError {
	/// A required dependency or setting is missing or out of range
	#[error("Invalid argument: {0}")]
	InvalidArgument(ErrorContext),

	/// The initial head query failed or reported an empty chain
	#[error("Initialization error: {0}")]
	InitializationError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ChainPollerServiceError {
	// Invalid argument error
	pub fn invalid_argument(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidArgument(ErrorContext::new(msg, source, metadata))
	}

	// Initialization error
	pub fn initialization_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InitializationError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for ChainPollerServiceError {
	fn trace_id(&self) -> String {
		match self {
			Self::InvalidArgument(ctx) => ctx.trace_id.clone(),
			Self::InitializationError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}

//! Errors raised while loading chain configuration files.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

type Source = Option<Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Failure while reading, decoding or checking a chain configuration
#[derive(ThisError, Debug)]
pub enum ConfigError {
	/// A decoded chain definition violates a constraint
	#[error("Validation error: {0}")]
	ValidationError(ErrorContext),

	/// A file is not a well-formed chain definition
	#[error("Parse error: {0}")]
	ParseError(ErrorContext),

	/// The chains directory or one of its files cannot be read
	#[error("File error: {0}")]
	FileError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ConfigError {
	// Not logged here, the loader's caller reports the failure
	pub fn validation_error(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ValidationError(ErrorContext::new(msg, source, metadata))
	}

	pub fn parse_error(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ParseError(ErrorContext::new(msg, source, metadata))
	}

	pub fn file_error(
		msg: impl Into<String>,
		source: Source,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::FileError(ErrorContext::new(msg, source, metadata))
	}

	/// Context of a loader failure, `None` for `Other`
	pub fn context(&self) -> Option<&ErrorContext> {
		match self {
			Self::ValidationError(ctx) | Self::ParseError(ctx) | Self::FileError(ctx) => Some(ctx),
			Self::Other(_) => None,
		}
	}
}

impl TraceableError for ConfigError {
	fn trace_id(&self) -> String {
		match self.context() {
			Some(ctx) => ctx.trace_id.clone(),
			None => Uuid::new_v4().to_string(),
		}
	}
}

//! Structured error context shared by every error type in the crate.
//!
//! Each error variant wraps an [`ErrorContext`] carrying a message, an
//! optional source, optional key-value metadata, an RFC 3339 timestamp and a
//! trace id. A context built on top of another traceable error inherits its
//! trace id, so one failure can be followed through the layers that wrapped it.

use chrono::Utc;
use std::{collections::HashMap, fmt};
use uuid::Uuid;

/// Source errors are searched this many levels deep for an existing trace id
const MAX_TRACE_DEPTH: usize = 3;

/// Message, cause and metadata of an error, stamped with time and trace id
#[derive(Debug)]
pub struct ErrorContext {
	pub message: String,
	pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
	pub metadata: Option<HashMap<String, String>>,
	/// RFC 3339 creation time
	pub timestamp: String,
	/// UUID v4, inherited from `source` when it carries one
	pub trace_id: String,
}

impl ErrorContext {
	/// Creates a context without logging it
	///
	/// Used for errors the caller is expected to handle, such as invalid
	/// arguments.
	pub fn new(
		message: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let trace_id = source
			.as_deref()
			.map(|src| TraceableError::trace_id(src))
			.unwrap_or_else(|| Uuid::new_v4().to_string());

		Self {
			message: message.into(),
			source,
			metadata,
			timestamp: Utc::now().to_rfc3339(),
			trace_id,
		}
	}

	/// Creates a context and emits it as an `error` event
	pub fn new_with_log(
		message: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let context = Self::new(message, source, metadata);
		log_error(&context);
		context
	}

	/// Adds one metadata entry
	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata
			.get_or_insert_with(HashMap::new)
			.insert(key.into(), value.into());
		self
	}

	/// `message [k1=v1, k2=v2]` with keys in alphabetical order
	pub fn format_with_metadata(&self) -> String {
		let Some(metadata) = self.metadata.as_ref().filter(|m| !m.is_empty()) else {
			return self.message.clone();
		};

		let mut entries: Vec<_> = metadata.iter().collect();
		entries.sort_by(|a, b| a.0.cmp(b.0));
		let parts: Vec<String> = entries
			.into_iter()
			.map(|(key, value)| format!("{}={}", key, value))
			.collect();

		format!("{} [{}]", self.message, parts.join(", "))
	}
}

impl fmt::Display for ErrorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_with_metadata())
	}
}

impl std::error::Error for ErrorContext {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source
			.as_ref()
			.map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
	}
}

/// An error that can report the trace id it was created with
pub trait TraceableError: std::error::Error + Send + Sync {
	fn trace_id(&self) -> String;
}

impl TraceableError for dyn std::error::Error + Send + Sync + 'static {
	fn trace_id(&self) -> String {
		if let Some(id) = try_extract_trace_id(self) {
			return id;
		}

		let mut source = self.source();
		let mut depth = 0;
		while let Some(err) = source {
			depth += 1;
			if depth > MAX_TRACE_DEPTH {
				break;
			}
			if let Some(id) = try_extract_trace_id(err) {
				return id;
			}
			source = err.source();
		}

		Uuid::new_v4().to_string()
	}
}

fn try_extract_trace_id(err: &(dyn std::error::Error + 'static)) -> Option<String> {
	if let Some(ctx) = err.downcast_ref::<ErrorContext>() {
		return Some(ctx.trace_id.clone());
	}

	macro_rules! try_downcast {
		($($ty:path),*) => {
			$(
				if let Some(e) = err.downcast_ref::<$ty>() {
					return Some(e.trace_id());
				}
			)*
		}
	}

	try_downcast!(
		crate::services::subscription::SubscriptionError,
		crate::services::chain_poller::ChainPollerServiceError,
		crate::services::sentinel::SentinelError,
		crate::services::blockchain::BlockChainError,
		crate::services::blockchain::TransportError,
		crate::models::ConfigError
	);

	None
}

/// Drops everything from the first HTML tag on, node error pages can be large
fn sanitize_error_message(message: &str) -> String {
	let has_html = ["<html>", "<head>", "<body>"]
		.iter()
		.any(|tag| message.contains(tag));
	match message.find('<') {
		Some(pos) if has_html => message[..pos].trim().to_string(),
		_ => message.to_string(),
	}
}

fn format_error_chain(err: &dyn std::error::Error) -> String {
	let mut result = sanitize_error_message(&err.to_string());
	let mut source = err.source();
	while let Some(err) = source {
		result.push_str("\n\tCaused by: ");
		result.push_str(&sanitize_error_message(&err.to_string()));
		source = err.source();
	}
	result
}

fn log_error(error: &ErrorContext) {
	match &error.source {
		Some(err) => tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			error.chain = %format_error_chain(&**err),
			"Error occurred"
		),
		None => tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			"Error occurred"
		),
	}
}

//! Parsing helpers for command line and configuration values.

use byte_unit::Byte;
use std::str::FromStr;

/// Parses a human-readable size such as "1GB", "500MiB" or "1024" into bytes.
///
/// Used as a `clap` value parser for `--log-max-size`.
pub fn parse_string_to_bytes_size(s: &str) -> Result<u64, String> {
	Byte::from_str(s)
		.map(|byte| byte.as_u64())
		.map_err(|e| format!("Invalid size format: '{}'. Error: {}", s, e))
}

/// Trims and lowercases `input`, the form chain names and slugs are compared in.
pub fn normalize_string(input: &str) -> String {
	input.trim().to_lowercase()
}

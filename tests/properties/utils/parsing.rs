use chain_sentinel::utils::{normalize_string, parse_string_to_bytes_size};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_plain_byte_counts_parse_exactly(bytes in 0u64..u32::MAX as u64) {
		prop_assert_eq!(parse_string_to_bytes_size(&bytes.to_string()), Ok(bytes));
		prop_assert_eq!(parse_string_to_bytes_size(&format!("{}B", bytes)), Ok(bytes));
	}

	#[test]
	fn test_decimal_and_binary_units(value in 1u64..1_000) {
		prop_assert_eq!(parse_string_to_bytes_size(&format!("{}KB", value)), Ok(value * 1_000));
		prop_assert_eq!(parse_string_to_bytes_size(&format!("{}KiB", value)), Ok(value * 1_024));
		prop_assert_eq!(parse_string_to_bytes_size(&format!("{}MB", value)), Ok(value * 1_000_000));
	}

	#[test]
	fn test_alphabetic_input_is_rejected(input in "[g-zG-Z]{1,8}") {
		prop_assert!(parse_string_to_bytes_size(&input).is_err());
	}

	#[test]
	fn test_normalize_is_idempotent(input in "[ a-zA-Z0-9_]{0,20}") {
		let once = normalize_string(&input);
		prop_assert_eq!(normalize_string(&once), once.clone());
		prop_assert_eq!(once.trim(), once.as_str());
	}
}

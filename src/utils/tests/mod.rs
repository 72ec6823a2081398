//! Test helper utilities
//!
//! - `builders`: Builders for chain configurations and logs
//! - `http`: Retrying HTTP clients for transport tests

pub mod builders {
	pub mod chain;
	pub mod log;
}


pub use builders::*;
pub use http::*;

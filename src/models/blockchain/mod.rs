//! Chain data models shared by the subscription and polling services.
//!
//! - `EventKey`: the (address, topic) pair identifying a subscribable stream
//! - `FilterQuery`: a block range plus address/topic constraints for fetching logs
//! - `Log`: a single on-chain event record

mod filter;
mod log;

pub use filter::{EventKey, FilterQuery};
pub use log::Log;

//! A replicated range of a sharded key-value store with one-shot key watches.
//!
//! Clients read keys (optionally leaving a watch behind), write and delete
//! keys through the replication layer, and get notified once when a watched
//! key changes. See [`Range`] for the request entry points.

mod codec;
mod config;
mod consensus;
pub mod constants;
mod errors;
mod metrics;
mod proto;
mod range;
mod session;
mod storage;
mod watch;

pub use codec::*;
pub use config::*;
pub use consensus::*;
pub use errors::*;
pub use metrics::*;
pub use proto::*;
pub use range::*;
pub use session::*;
pub use storage::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

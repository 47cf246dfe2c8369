//! One-shot key watches.
//!
//! ```text
//! WatchGet ──add_key_watcher──▶ WatcherRegistry (DashMap<key, {session}>)
//!                                      ▲
//! apply() ──▶ NotificationFanout ──────┘ snapshot, push, remove
//! ```
//!
//! A watch fires at most once; the client re-registers with another
//! WatchGet. Entries of closed sessions are dropped on the first failed
//! push, and [`WatcherEvictor`] sweeps entries past their TTL.

mod evictor;
mod fanout;
mod registry;

#[cfg(test)]
mod registry_test;

pub use evictor::*;
pub use fanout::*;
pub use registry::*;

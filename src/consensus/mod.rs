//! Propose side of the replication pipeline.
//!
//! The replication transport itself (log persistence, elections, peer
//! traffic) lives behind [`ConsensusLayer`]. Committed commands come back
//! through the range's apply callback in log order on every replica.

mod command;
mod pipeline;


pub use command::*;
pub use pipeline::*;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait ConsensusLayer: Send + Sync + 'static {
    /// Submits an opaque command to the replication log.
    ///
    /// Leader only; returns `false` when the command is refused outright
    /// (not leader, log full).
    fn propose(
        &self,
        command: Vec<u8>,
    ) -> bool;
}

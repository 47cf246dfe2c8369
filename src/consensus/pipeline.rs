use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::Command;
use crate::CommandId;
use crate::ConsensusLayer;
use crate::RequestHeader;
use crate::ResponseKind;
use crate::Session;

/// A client waiting for the outcome of one of its proposals.
#[derive(Clone)]
pub struct PendingReply {
    pub session: Arc<dyn Session>,
    pub kind: ResponseKind,
    pub header: RequestHeader,
}

impl std::fmt::Debug for PendingReply {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("session_id", &self.session.id())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Submits commands to the replication layer and remembers who is waiting
/// for each of them.
///
/// `propose` never waits for the outcome. The reply is sent later from the
/// apply stream, which claims the waiting session with [`take_pending`].
///
/// [`take_pending`]: ConsensusPipeline::take_pending
pub struct ConsensusPipeline {
    node_id: u64,
    consensus: Arc<dyn ConsensusLayer>,
    next_seq: AtomicU64,
    pending: DashMap<u64, PendingReply>,
}

impl std::fmt::Debug for ConsensusPipeline {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConsensusPipeline")
            .field("node_id", &self.node_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ConsensusPipeline {
    pub fn new(
        node_id: u64,
        consensus: Arc<dyn ConsensusLayer>,
    ) -> Self {
        Self {
            node_id,
            consensus,
            next_seq: AtomicU64::new(1),
            pending: DashMap::new(),
        }
    }

    pub fn next_command_id(&self) -> CommandId {
        CommandId {
            node_id: self.node_id,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Hands `command` to the replication layer.
    ///
    /// Returns `false` if the command never entered the log; the waiting
    /// session is forgotten and the caller answers the client itself.
    pub fn propose(
        &self,
        command: Command,
        waiting: PendingReply,
    ) -> bool {
        let id = command.id;
        let bytes = match command.encode() {
            Ok(b) => b,
            Err(e) => {
                error!(?id, "encode command failed: {:?}", e);
                return false;
            }
        };

        // Registered first: the apply callback may run before propose returns.
        self.pending.insert(id.seq, waiting);
        if self.consensus.propose(bytes) {
            debug!(?id, cmd_type = command.cmd_type.as_str(), "proposed");
            true
        } else {
            self.pending.remove(&id.seq);
            warn!(?id, "consensus rejected proposal");
            false
        }
    }

    pub fn is_local(
        &self,
        id: &CommandId,
    ) -> bool {
        id.node_id == self.node_id
    }

    /// Claims the session waiting on `id`. `None` for commands originated by
    /// other nodes, or when the entry was already claimed.
    pub fn take_pending(
        &self,
        id: &CommandId,
    ) -> Option<PendingReply> {
        if !self.is_local(id) {
            return None;
        }
        self.pending.remove(&id.seq).map(|(_, p)| p)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }
}

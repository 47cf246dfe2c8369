//! In-process replica group sharing one ordered log.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use watch_range::ChannelSession;
use watch_range::ConsensusLayer;
use watch_range::MemStorageEngine;
use watch_range::Range;
use watch_range::RangeConfig;
use watch_range::RangeMeta;
use watch_range::RequestHeader;
use watch_range::SizeSplitChecker;
use watch_range::WatchConfig;
use watch_range::WatchKeyValue;
use watch_range::WatchResponse;

pub const RANGE_ID: u64 = 1;
pub const RANGE_EPOCH: u64 = 5;

/// Ordered log shared by every replica. Entries stay in the log until
/// [`LocalCluster::replicate`] hands them to the replicas.
#[derive(Debug, Default)]
pub struct LocalConsensus {
    log: Mutex<Vec<Vec<u8>>>,
}

impl LocalConsensus {
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.log.lock())
    }
}

impl ConsensusLayer for LocalConsensus {
    fn propose(
        &self,
        command: Vec<u8>,
    ) -> bool {
        self.log.lock().push(command);
        true
    }
}

pub struct LocalCluster {
    pub replicas: Vec<Arc<Range>>,
    pub consensus: Arc<LocalConsensus>,
}

impl LocalCluster {
    /// `size` replicas of range `["a", "z")`; node 1 leads.
    pub fn new(size: u64) -> Self {
        let consensus = Arc::new(LocalConsensus::default());
        let replicas = (1..=size)
            .map(|node_id| {
                let config = RangeConfig {
                    node_id,
                    ..Default::default()
                };
                let range = Range::new(
                    meta(),
                    &config,
                    &WatchConfig::default(),
                    Arc::new(MemStorageEngine::new()),
                    consensus.clone(),
                    Arc::new(SizeSplitChecker::new(config.split_check_size_bytes)),
                );
                range.set_leader(node_id == 1);
                Arc::new(range)
            })
            .collect();
        Self { replicas, consensus }
    }

    pub fn node(
        &self,
        node_id: u64,
    ) -> &Arc<Range> {
        &self.replicas[(node_id - 1) as usize]
    }

    pub fn transfer_leadership(
        &self,
        to: u64,
    ) {
        for replica in &self.replicas {
            replica.set_leader(replica.node_id() == to);
        }
    }

    /// Applies every committed entry on every replica, in log order.
    pub fn replicate(&self) -> usize {
        let entries = self.consensus.take();
        for entry in &entries {
            for replica in &self.replicas {
                let _ = replica.apply_committed(entry);
            }
        }
        entries.len()
    }

    /// Forwards the log to per-replica apply streams.
    pub fn replicate_to(
        &self,
        streams: &[mpsc::UnboundedSender<Vec<u8>>],
    ) {
        for entry in self.consensus.take() {
            for tx in streams {
                let _ = tx.send(entry.clone());
            }
        }
    }
}

pub fn meta() -> RangeMeta {
    RangeMeta::from_user_bounds(RANGE_ID, 1, b"a", b"z", RANGE_EPOCH)
}

pub fn header() -> RequestHeader {
    RequestHeader {
        range_id: RANGE_ID,
        range_epoch: RANGE_EPOCH,
    }
}

pub fn kv(
    key: &str,
    value: &str,
) -> WatchKeyValue {
    WatchKeyValue::new(key, value)
}

pub fn session(id: u64) -> (Arc<ChannelSession>, mpsc::UnboundedReceiver<WatchResponse>) {
    let (session, rx) = ChannelSession::new(id);
    (Arc::new(session), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<WatchResponse>) -> Vec<WatchResponse> {
    let mut out = Vec::new();
    while let Ok(resp) = rx.try_recv() {
        out.push(resp);
    }
    out
}

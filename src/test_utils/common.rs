use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::ChannelSession;
use crate::ConsensusLayer;
use crate::MemStorageEngine;
use crate::MockSession;
use crate::PendingReply;
use crate::Range;
use crate::RangeConfig;
use crate::RangeError;
use crate::RangeMeta;
use crate::RequestHeader;
use crate::ResponseKind;
use crate::SessionId;
use crate::SizeSplitChecker;
use crate::StatusCode;
use crate::WatchConfig;
use crate::WatchResponse;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Range of table 1 over single-segment user bounds `[start, end)`.
pub fn range_meta(
    id: u64,
    start: &str,
    end: &str,
    epoch: u64,
) -> RangeMeta {
    RangeMeta::from_user_bounds(id, 1, start.as_bytes(), end.as_bytes(), epoch)
}

pub fn header(
    range_id: u64,
    range_epoch: u64,
) -> RequestHeader {
    RequestHeader { range_id, range_epoch }
}

pub fn mock_session(id: SessionId) -> MockSession {
    let mut session = MockSession::new();
    session.expect_id().return_const(id);
    session
}

pub fn pending_reply(session_id: SessionId) -> PendingReply {
    PendingReply {
        session: Arc::new(mock_session(session_id)),
        kind: ResponseKind::WatchPut,
        header: RequestHeader::default(),
    }
}

pub fn channel_session(id: SessionId) -> (Arc<ChannelSession>, mpsc::UnboundedReceiver<WatchResponse>) {
    let (session, rx) = ChannelSession::new(id);
    (Arc::new(session), rx)
}

/// Everything already pushed to `rx`, without waiting.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<WatchResponse>) -> Vec<WatchResponse> {
    let mut out = Vec::new();
    while let Ok(resp) = rx.try_recv() {
        out.push(resp);
    }
    out
}

/// Consensus stand-in that records proposals instead of replicating them.
#[derive(Debug)]
pub struct RecordingConsensus {
    accept: AtomicBool,
    proposed: Mutex<Vec<Vec<u8>>>,
}

impl Default for RecordingConsensus {
    fn default() -> Self {
        Self {
            accept: AtomicBool::new(true),
            proposed: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingConsensus {
    pub fn set_accept(
        &self,
        accept: bool,
    ) {
        self.accept.store(accept, Ordering::Release);
    }

    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.proposed.lock())
    }

    pub fn proposed_len(&self) -> usize {
        self.proposed.lock().len()
    }
}

impl ConsensusLayer for RecordingConsensus {
    fn propose(
        &self,
        command: Vec<u8>,
    ) -> bool {
        if !self.accept.load(Ordering::Acquire) {
            return false;
        }
        self.proposed.lock().push(command);
        true
    }
}

/// Single-replica range over an in-memory engine. Proposals stay in
/// `consensus` until [`TestRange::commit_all`] applies them.
pub struct TestRange {
    pub range: Range,
    pub storage: Arc<MemStorageEngine>,
    pub consensus: Arc<RecordingConsensus>,
    pub host: Arc<SizeSplitChecker>,
}

impl TestRange {
    pub fn leader(meta: RangeMeta) -> Self {
        Self::with_config(meta, &RangeConfig::default(), &WatchConfig::default())
    }

    pub fn with_config(
        meta: RangeMeta,
        range_config: &RangeConfig,
        watch_config: &WatchConfig,
    ) -> Self {
        let storage = Arc::new(MemStorageEngine::new());
        let consensus = Arc::new(RecordingConsensus::default());
        let host = Arc::new(SizeSplitChecker::new(range_config.split_check_size_bytes));
        let range = Range::new(
            meta,
            range_config,
            watch_config,
            storage.clone(),
            consensus.clone(),
            host.clone(),
        );
        range.set_leader(true);
        Self {
            range,
            storage,
            consensus,
            host,
        }
    }

    /// Applies every recorded proposal in order.
    pub fn commit_all(&self) -> Vec<std::result::Result<StatusCode, RangeError>> {
        self.consensus
            .take()
            .iter()
            .map(|entry| self.range.apply_committed(entry))
            .collect()
    }
}

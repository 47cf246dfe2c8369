//! A replicated shard of the key space with one-shot key watches.
//!
//! Requests enter through the handlers in `requests.rs`, pass the
//! [`AdmissionGuard`] and either read storage directly (WatchGet, PureGet)
//! or are proposed to the replication layer (WatchPut, WatchDelete).
//! Committed commands come back through [`Range::apply_committed`] on every
//! replica; the [`ApplyEngine`] writes them, answers the originating client
//! and fans the change out to watchers.

mod admission;
mod apply;
mod apply_loop;
mod host;
mod meta;
mod requests;


pub use admission::*;
pub use apply::*;
pub use apply_loop::*;
pub use host::*;
pub use meta::*;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::open_storage_engine;
use crate::Command;
use crate::ConsensusLayer;
use crate::ConsensusPipeline;
use crate::NotificationFanout;
use crate::RangeConfig;
use crate::RangeError;
use crate::Result;
use crate::Settings;
use crate::StatusCode;
use crate::StorageEngine;
use crate::WatchConfig;
use crate::WatcherRegistry;
use crate::PENDING_ON_STEP_DOWN;

pub struct Range {
    node_id: u64,
    meta: ArcSwap<RangeMeta>,
    is_leader: AtomicBool,
    /// Last assigned version; advanced only when a Put is admitted
    version_seq: AtomicI64,
    /// Held from version assignment until the Put is in the log, so log
    /// order matches version order
    propose_lock: Mutex<()>,
    storage: Arc<dyn StorageEngine>,
    host: Arc<dyn RangeHost>,
    pipeline: ConsensusPipeline,
    fanout: NotificationFanout,
}

impl std::fmt::Debug for Range {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Range")
            .field("node_id", &self.node_id)
            .field("meta", &self.meta.load())
            .field("is_leader", &self.is_leader())
            .field("version", &self.version())
            .finish()
    }
}

impl Range {
    pub fn new(
        meta: RangeMeta,
        range_config: &RangeConfig,
        watch_config: &WatchConfig,
        storage: Arc<dyn StorageEngine>,
        consensus: Arc<dyn ConsensusLayer>,
        host: Arc<dyn RangeHost>,
    ) -> Self {
        let registry = Arc::new(WatcherRegistry::new(watch_config.max_watchers_per_key));
        info!(
            range_id = meta.id,
            node_id = range_config.node_id,
            epoch = meta.epoch,
            "range created"
        );
        Self {
            node_id: range_config.node_id,
            meta: ArcSwap::from_pointee(meta),
            is_leader: AtomicBool::new(false),
            version_seq: AtomicI64::new(range_config.initial_version),
            propose_lock: Mutex::new(()),
            storage,
            host,
            pipeline: ConsensusPipeline::new(range_config.node_id, consensus),
            fanout: NotificationFanout::new(registry),
        }
    }

    /// Opens the configured storage engine and builds a range hosted by a
    /// [`SizeSplitChecker`].
    pub fn open(
        meta: RangeMeta,
        settings: &Settings,
        consensus: Arc<dyn ConsensusLayer>,
    ) -> Result<Self> {
        let storage = open_storage_engine(&settings.storage, meta.id)?;
        let host = Arc::new(SizeSplitChecker::new(settings.range.split_check_size_bytes));
        Ok(Self::new(meta, &settings.range, &settings.watch, storage, consensus, host))
    }

    pub fn id(&self) -> u64 {
        self.meta.load().id
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn meta(&self) -> Arc<RangeMeta> {
        self.meta.load_full()
    }

    /// Installs new boundaries, e.g. after a split.
    pub fn update_meta(
        &self,
        meta: RangeMeta,
    ) {
        let current = self.meta.load();
        if meta.id != current.id {
            warn!(range_id = current.id, new_id = meta.id, "ignoring meta of another range");
            return;
        }
        if meta.epoch < current.epoch {
            warn!(
                range_id = current.id,
                epoch = current.epoch,
                new_epoch = meta.epoch,
                "ignoring meta with older epoch"
            );
            return;
        }
        info!(range_id = meta.id, epoch = meta.epoch, "range meta updated");
        self.meta.store(Arc::new(meta));
    }

    pub fn set_leader(
        &self,
        is_leader: bool,
    ) {
        let was = self.is_leader.swap(is_leader, Ordering::AcqRel);
        if was != is_leader {
            info!(range_id = self.id(), node_id = self.node_id, is_leader, "leadership changed");
        }
        if was && !is_leader {
            let pending = self.pipeline.pending_len();
            if pending > 0 {
                // Entries the new leader drops are never applied here, so
                // their clients get no reply from this replica.
                warn!(
                    range_id = self.id(),
                    node_id = self.node_id,
                    pending,
                    "stepped down with proposals still waiting for apply"
                );
                PENDING_ON_STEP_DOWN.inc_by(pending as u64);
            }
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::Acquire)
    }

    /// Last version assigned by this replica
    pub fn version(&self) -> i64 {
        self.version_seq.load(Ordering::Acquire)
    }

    pub fn registry(&self) -> &Arc<WatcherRegistry> {
        self.fanout.registry()
    }

    pub fn storage(&self) -> &Arc<dyn StorageEngine> {
        &self.storage
    }

    /// Proposals still waiting for their apply-time reply
    pub fn pending_replies(&self) -> usize {
        self.pipeline.pending_len()
    }

    /// Consensus apply callback: decodes one committed entry and applies it.
    ///
    /// An undecodable entry is logged as `CorruptRecord` and reported to the
    /// caller as `Unknown`; the caller moves on to the next entry.
    pub fn apply_committed(
        &self,
        entry: &[u8],
    ) -> std::result::Result<StatusCode, RangeError> {
        let command = Command::decode(entry).map_err(|e| {
            error!(range_id = self.id(), "skipping committed entry: {}", e);
            e.surfaced()
        })?;
        self.apply(command)
    }

    pub fn apply(
        &self,
        command: Command,
    ) -> std::result::Result<StatusCode, RangeError> {
        let meta = self.meta.load_full();
        if command.range_id != meta.id {
            warn!(range_id = meta.id, cmd_range_id = command.range_id, "command addressed to another range");
        }
        ApplyEngine::new(
            &meta,
            self.storage.as_ref(),
            self.host.as_ref(),
            &self.pipeline,
            &self.fanout,
        )
        .apply(command)
    }

    fn admission<'a>(
        &'a self,
        meta: &'a RangeMeta,
    ) -> AdmissionGuard<'a> {
        AdmissionGuard::new(meta, self.is_leader(), self.host.as_ref())
    }

    /// Assigns the version of an admitted Put. Callers hold `propose_lock`.
    fn next_version(&self) -> i64 {
        self.version_seq.fetch_add(1, Ordering::AcqRel) + 1
    }
}

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::info;

/// Services the hosting node provides to a range.
#[cfg_attr(test, automock)]
pub trait RangeHost: Send + Sync + 'static {
    /// `false` when the node has no free capacity for new writes
    fn check_writeable(&self) -> bool;

    /// Reports `size` bytes written to `range_id` by a locally originated
    /// Put; the host decides whether the range should split.
    fn check_split(
        &self,
        range_id: u64,
        size: u64,
    );
}

/// Default host: tracks written bytes against a threshold and exposes a
/// writeable flag.
#[derive(Debug)]
pub struct SizeSplitChecker {
    split_size: u64,
    written: AtomicU64,
    split_requested: AtomicBool,
    writeable: AtomicBool,
}

impl SizeSplitChecker {
    pub fn new(split_size: u64) -> Self {
        Self {
            split_size,
            written: AtomicU64::new(0),
            split_requested: AtomicBool::new(false),
            writeable: AtomicBool::new(true),
        }
    }

    pub fn set_writeable(
        &self,
        writeable: bool,
    ) {
        self.writeable.store(writeable, Ordering::Release);
    }

    pub fn split_requested(&self) -> bool {
        self.split_requested.load(Ordering::Acquire)
    }

    /// Called once the split has been carried out.
    pub fn reset(&self) {
        self.written.store(0, Ordering::Release);
        self.split_requested.store(false, Ordering::Release);
    }

    pub fn written_bytes(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }
}

impl RangeHost for SizeSplitChecker {
    fn check_writeable(&self) -> bool {
        self.writeable.load(Ordering::Acquire)
    }

    fn check_split(
        &self,
        range_id: u64,
        size: u64,
    ) {
        let total = self.written.fetch_add(size, Ordering::AcqRel) + size;
        if total < self.split_size {
            return;
        }
        if !self.split_requested.swap(true, Ordering::AcqRel) {
            info!(range_id, total, threshold = self.split_size, "range reached split size");
        } else {
            debug!(range_id, total, "split already requested");
        }
    }
}

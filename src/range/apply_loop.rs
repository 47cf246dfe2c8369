use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Range;

/// Sequential apply stream of one replica.
///
/// The replication layer pushes committed entries, in log order, into the
/// channel; each entry is applied before the next one is read. A failing
/// entry never stops the loop.
pub struct ApplyLoop {
    range: Arc<Range>,
    committed_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown_signal: watch::Receiver<()>,
}

impl ApplyLoop {
    pub fn new(
        range: Arc<Range>,
        committed_rx: mpsc::UnboundedReceiver<Vec<u8>>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            range,
            committed_rx,
            shutdown_signal,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    pub async fn run(mut self) {
        let range_id = self.range.id();
        let node_id = self.range.node_id();
        loop {
            tokio::select! {
                biased;
                // P0: shutdown received;
                _ = self.shutdown_signal.changed() => {
                    warn!("[Node-{}] apply loop of range {} shutdown signal received.", node_id, range_id);
                    return;
                }

                entry = self.committed_rx.recv() => {
                    let Some(entry) = entry else {
                        debug!("[Node-{}] committed stream of range {} closed", node_id, range_id);
                        return;
                    };
                    match self.range.apply_committed(&entry) {
                        Ok(code) => trace!("[Node-{}] applied entry, code = {:?}", node_id, code),
                        Err(e) => debug!("[Node-{}] entry aborted: {}", node_id, e),
                    }
                }
            }
        }
    }
}

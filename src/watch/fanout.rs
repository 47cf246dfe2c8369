use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::EventType;
use crate::FunctionKind;
use crate::KeyCodec;
use crate::RangeMeta;
use crate::RequestHeader;
use crate::ResponseKind;
use crate::Result;
use crate::WatchResponse;
use crate::WatcherRegistry;
use crate::NOTIFY_DELIVERED;
use crate::NOTIFY_FAILED;

/// Pushes applied mutations to the sessions watching the mutated key.
///
/// Watches are one-shot: an entry is removed once its event is delivered.
/// A failed push leaves the entry in place unless the session's transport
/// is gone, in which case the entry is dropped as well.
#[derive(Debug, Clone)]
pub struct NotificationFanout {
    registry: Arc<WatcherRegistry>,
}

impl NotificationFanout {
    pub fn new(registry: Arc<WatcherRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<WatcherRegistry> {
        &self.registry
    }

    /// Notifies every watcher of `encoded_key` about a committed mutation.
    ///
    /// Returns the number of sessions the event was delivered to. A decode
    /// failure is returned as an error and nothing is sent.
    pub fn notify(
        &self,
        meta: &RangeMeta,
        event_type: EventType,
        encoded_key: &[u8],
        encoded_value: &[u8],
    ) -> Result<usize> {
        let kind = match event_type {
            EventType::Put => FunctionKind::WatchPut,
            EventType::Delete => FunctionKind::WatchDelete,
        };
        let kv = KeyCodec::decode(kind, meta, encoded_key, encoded_value).map_err(|e| {
            error!(range_id = meta.id, "notify decode failed: {}", e);
            e
        })?;

        let watchers = self.registry.get_key_watchers(encoded_key);
        if watchers.is_empty() {
            return Ok(0);
        }

        let header = RequestHeader {
            range_id: meta.id,
            range_epoch: meta.epoch,
        };
        let total = watchers.len();
        let mut delivered = 0;

        for (idx, session) in watchers.into_iter().enumerate() {
            let session_id = session.id();
            let mut resp = WatchResponse::new(ResponseKind::Notify, &header, meta.id, session_id);
            resp.push_event(event_type, kv.clone());

            debug!(
                range_id = meta.id,
                session_id,
                "notify ({}/{}) {:?} version {}",
                idx + 1,
                total,
                event_type,
                kv.version
            );

            match session.send(resp) {
                Ok(()) => {
                    delivered += 1;
                    NOTIFY_DELIVERED.inc();
                    if let Err(e) = self.registry.del_key_watcher(session_id, encoded_key) {
                        warn!(range_id = meta.id, session_id, "del_key_watcher after notify: {}", e);
                    }
                }
                Err(e) => {
                    NOTIFY_FAILED.inc();
                    error!(range_id = meta.id, session_id, "notify failed: {}", e);
                    if !session.is_alive() {
                        match self.registry.del_key_watcher(session_id, encoded_key) {
                            Ok(()) => warn!(range_id = meta.id, session_id, "dropped watcher of closed session"),
                            Err(e) => warn!(range_id = meta.id, session_id, "del_key_watcher of closed session: {}", e),
                        }
                    }
                }
            }
        }

        Ok(delivered)
    }
}

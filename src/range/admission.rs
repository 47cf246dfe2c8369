use tracing::debug;

use crate::KeyCodec;
use crate::RangeError;
use crate::RangeHost;
use crate::RangeMeta;
use crate::RequestHeader;
use crate::WatchKeyValue;
use crate::REJECTED_REQUESTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPath {
    Read,
    Write,
}

/// Front-door checks every request passes before touching storage or the
/// replication log. Has no side effects besides a rejection counter.
pub struct AdmissionGuard<'a> {
    meta: &'a RangeMeta,
    is_leader: bool,
    host: &'a dyn RangeHost,
}

impl<'a> AdmissionGuard<'a> {
    pub fn new(
        meta: &'a RangeMeta,
        is_leader: bool,
        host: &'a dyn RangeHost,
    ) -> Self {
        Self {
            meta,
            is_leader,
            host,
        }
    }

    /// Admits the request and returns its encoded key.
    ///
    /// Checks run in this order: leadership, write capacity (write path
    /// only), key presence, then boundaries. A key outside the boundaries is
    /// only rejected when the caller routed with the current epoch; a stale
    /// epoch means the caller raced a split and is let through.
    pub fn admit(
        &self,
        path: RequestPath,
        header: &RequestHeader,
        kv: &WatchKeyValue,
    ) -> Result<Vec<u8>, RangeError> {
        if !self.is_leader {
            return Err(self.reject("not_leader", RangeError::NotLeader { range_id: self.meta.id }));
        }

        if path == RequestPath::Write && !self.host.check_writeable() {
            return Err(self.reject("no_space", RangeError::NoSpace));
        }

        if kv.key_is_empty() {
            return Err(self.reject(
                "invalid_argument",
                RangeError::InvalidArgument("key is empty".into()),
            ));
        }

        let encoded = KeyCodec::encode_key(self.meta, kv).map_err(|e| self.reject("invalid_argument", e))?;

        if !self.meta.contains(&encoded) {
            if self.meta.epoch_equals(header.range_epoch) {
                return Err(self.reject(
                    "key_not_in_range",
                    RangeError::KeyNotInRange {
                        key: encoded,
                        start: self.meta.start_key.clone(),
                        end: self.meta.end_key.clone(),
                    },
                ));
            }
            debug!(
                range_id = self.meta.id,
                caller_epoch = header.range_epoch,
                epoch = self.meta.epoch,
                "key outside range under stale epoch, admitted"
            );
        }

        Ok(encoded)
    }

    fn reject(
        &self,
        reason: &str,
        err: RangeError,
    ) -> RangeError {
        REJECTED_REQUESTS.with_label_values(&[reason]).inc();
        err
    }
}

//! Client session handles.
//!
//! A session is the only way the range talks back to a client: the
//! synchronous reply to a request and any later watch notification both go
//! through [`Session::send`]. Replies to writes are produced from the apply
//! stream, so handles are shared across threads.


#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::WatchError;
use crate::WatchResponse;

/// Opaque identifier the transport guarantees unique per connected client
pub type SessionId = u64;

#[cfg_attr(test, automock)]
pub trait Session: Send + Sync + 'static {
    fn id(&self) -> SessionId;

    /// Pushes one response to the client.
    fn send(
        &self,
        response: WatchResponse,
    ) -> std::result::Result<(), WatchError>;

    /// `false` once the underlying transport is gone for good
    fn is_alive(&self) -> bool;
}

/// Session backed by a tokio channel; the transport drains the receiver.
#[derive(Debug, Clone)]
pub struct ChannelSession {
    id: SessionId,
    tx: mpsc::UnboundedSender<WatchResponse>,
}

impl ChannelSession {
    pub fn new(id: SessionId) -> (Self, mpsc::UnboundedReceiver<WatchResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }
}

impl Session for ChannelSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn send(
        &self,
        response: WatchResponse,
    ) -> std::result::Result<(), WatchError> {
        trace!(session_id = self.id, kind = ?response.kind, "session send");
        self.tx
            .send(response)
            .map_err(|_| WatchError::SessionClosed(self.id))
    }

    fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

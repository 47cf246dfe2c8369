//! Registry of sessions waiting for the next change of a key.
//!
//! Watchers are grouped by encoded key in a `DashMap`, so operations on
//! different keys only contend when they hash to the same shard. Each
//! operation is atomic for its key; nothing is ordered across keys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::Session;
use crate::SessionId;
use crate::WatchError;
use crate::WATCHERS_EVICTED;
use crate::WATCHERS_REGISTERED;

/// A pending one-shot subscription.
#[derive(Clone)]
pub struct WatcherEntry {
    pub session: Arc<dyn Session>,
    pub registered_at: Instant,
}

impl std::fmt::Debug for WatcherEntry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatcherEntry")
            .field("session_id", &self.session.id())
            .field("registered_at", &self.registered_at)
            .finish()
    }
}

#[derive(Debug)]
pub struct WatcherRegistry {
    /// Sessions keyed by id so a session appears at most once per key
    watchers: DashMap<Bytes, HashMap<SessionId, WatcherEntry>>,
    max_watchers_per_key: usize,
}

impl WatcherRegistry {
    pub fn new(max_watchers_per_key: usize) -> Self {
        Self {
            watchers: DashMap::new(),
            max_watchers_per_key,
        }
    }

    /// Registers `session` on `key`.
    ///
    /// Idempotent per (key, session): a second registration keeps the
    /// original entry. Returns `false` when the key already holds
    /// `max_watchers_per_key` other sessions.
    pub fn add_key_watcher(
        &self,
        key: &[u8],
        session: Arc<dyn Session>,
    ) -> bool {
        self.watch_key(key, session, || (true, ()), |(), registered| registered)
    }

    /// Registers `session` on `key` if `decide` asks for it, keeping the key
    /// locked from the call of `decide` until `then` returns.
    ///
    /// `decide` returns whether to register plus a value handed to `then`
    /// along with the registration outcome. A concurrent
    /// [`get_key_watchers`] on the same key runs entirely before `decide` or
    /// entirely after `then`. Neither closure may call back into the
    /// registry.
    ///
    /// [`get_key_watchers`]: WatcherRegistry::get_key_watchers
    pub fn watch_key<R, T>(
        &self,
        key: &[u8],
        session: Arc<dyn Session>,
        decide: impl FnOnce() -> (bool, R),
        then: impl FnOnce(R, bool) -> T,
    ) -> T {
        match self.watchers.entry(Bytes::copy_from_slice(key)) {
            Entry::Occupied(mut occupied) => {
                let (wanted, out) = decide();
                let registered = wanted && self.insert_watcher(occupied.get_mut(), session);
                then(out, registered)
            }
            Entry::Vacant(vacant) => {
                let (wanted, out) = decide();
                if wanted && self.max_watchers_per_key > 0 {
                    let mut watchers = vacant.insert(HashMap::new());
                    let registered = self.insert_watcher(&mut watchers, session);
                    then(out, registered)
                } else {
                    let result = then(out, false);
                    drop(vacant);
                    result
                }
            }
        }
    }

    fn insert_watcher(
        &self,
        watchers: &mut HashMap<SessionId, WatcherEntry>,
        session: Arc<dyn Session>,
    ) -> bool {
        let session_id = session.id();
        if watchers.contains_key(&session_id) {
            trace!(session_id, "watcher already registered");
            return true;
        }
        if watchers.len() >= self.max_watchers_per_key {
            warn!(
                session_id,
                limit = self.max_watchers_per_key,
                "too many watchers on key, registration skipped"
            );
            return false;
        }

        watchers.insert(
            session_id,
            WatcherEntry {
                session,
                registered_at: Instant::now(),
            },
        );
        WATCHERS_REGISTERED.inc();
        debug!(session_id, watchers = watchers.len(), "add_key_watcher");
        true
    }

    /// Point-in-time snapshot of the sessions waiting on `key`.
    pub fn get_key_watchers(
        &self,
        key: &[u8],
    ) -> Vec<Arc<dyn Session>> {
        self.watchers
            .get(key)
            .map(|w| w.values().map(|e| e.session.clone()).collect())
            .unwrap_or_default()
    }

    /// Removes one (session, key) entry; the key disappears with its last
    /// watcher.
    pub fn del_key_watcher(
        &self,
        session_id: SessionId,
        key: &[u8],
    ) -> std::result::Result<(), WatchError> {
        let mut found = false;
        self.watchers.remove_if_mut(key, |_key, watchers| {
            found = watchers.remove(&session_id).is_some();
            watchers.is_empty()
        });

        if found {
            Ok(())
        } else {
            Err(WatchError::WatcherNotFound {
                session_id,
                key: key.to_vec(),
            })
        }
    }

    /// Drops every entry of a disconnected session. Returns how many were
    /// removed.
    pub fn remove_session(
        &self,
        session_id: SessionId,
    ) -> usize {
        let mut removed = 0;
        self.watchers.retain(|_key, watchers| {
            if watchers.remove(&session_id).is_some() {
                removed += 1;
            }
            !watchers.is_empty()
        });
        debug!(session_id, removed, "remove_session");
        removed
    }

    /// Drops entries registered more than `ttl` ago or whose session is gone.
    pub fn evict_expired(
        &self,
        ttl: Duration,
    ) -> usize {
        let mut evicted = 0;
        self.watchers.retain(|_key, watchers| {
            watchers.retain(|_, entry| {
                let keep = entry.registered_at.elapsed() < ttl && entry.session.is_alive();
                if !keep {
                    evicted += 1;
                }
                keep
            });
            !watchers.is_empty()
        });
        if evicted > 0 {
            WATCHERS_EVICTED.inc_by(evicted as u64);
            debug!(evicted, "evict_expired");
        }
        evicted
    }

    pub fn watcher_count(
        &self,
        key: &[u8],
    ) -> usize {
        self.watchers.get(key).map(|w| w.len()).unwrap_or(0)
    }

    pub fn watched_key_count(&self) -> usize {
        self.watchers.len()
    }

    pub fn contains(
        &self,
        session_id: SessionId,
        key: &[u8],
    ) -> bool {
        self.watchers
            .get(key)
            .map(|w| w.contains_key(&session_id))
            .unwrap_or(false)
    }
}

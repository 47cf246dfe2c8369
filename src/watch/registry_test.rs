use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::*;
use crate::test_utils::channel_session;
use crate::test_utils::mock_session;
use crate::Session;
use crate::WatchConfig;
use crate::WatchError;

const KEY: &[u8] = b"\x01encoded-foo";
const OTHER_KEY: &[u8] = b"\x01encoded-bar";

fn session(id: u64) -> Arc<dyn Session> {
    Arc::new(mock_session(id))
}

#[test]
fn test_add_key_watcher_is_idempotent_per_session() {
    let registry = WatcherRegistry::new(16);

    assert!(registry.add_key_watcher(KEY, session(1)));
    assert!(registry.add_key_watcher(KEY, session(1)));
    assert!(registry.add_key_watcher(KEY, session(2)));

    assert_eq!(registry.watcher_count(KEY), 2);
    assert_eq!(registry.watched_key_count(), 1);
}

#[test]
fn test_get_key_watchers_returns_snapshot() {
    let registry = WatcherRegistry::new(16);
    registry.add_key_watcher(KEY, session(1));
    registry.add_key_watcher(KEY, session(2));
    registry.add_key_watcher(OTHER_KEY, session(3));

    let mut ids: Vec<_> = registry.get_key_watchers(KEY).iter().map(|s| s.id()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    // Later changes do not affect an earlier snapshot
    let snapshot = registry.get_key_watchers(OTHER_KEY);
    registry.del_key_watcher(3, OTHER_KEY).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(registry.get_key_watchers(OTHER_KEY).is_empty());
}

#[test]
fn test_del_key_watcher_drops_key_with_last_watcher() {
    let registry = WatcherRegistry::new(16);
    registry.add_key_watcher(KEY, session(1));
    registry.add_key_watcher(KEY, session(2));

    registry.del_key_watcher(1, KEY).unwrap();
    assert!(!registry.contains(1, KEY));
    assert!(registry.contains(2, KEY));

    registry.del_key_watcher(2, KEY).unwrap();
    assert_eq!(registry.watched_key_count(), 0);
}

#[test]
fn test_del_missing_watcher_reports_not_found() {
    let registry = WatcherRegistry::new(16);
    registry.add_key_watcher(KEY, session(1));

    match registry.del_key_watcher(9, KEY) {
        Err(WatchError::WatcherNotFound { session_id, key }) => {
            assert_eq!(session_id, 9);
            assert_eq!(key, KEY.to_vec());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(registry.del_key_watcher(1, OTHER_KEY).is_err());
    assert!(registry.contains(1, KEY));
}

#[test]
fn test_registration_respects_per_key_limit() {
    let registry = WatcherRegistry::new(2);

    assert!(registry.add_key_watcher(KEY, session(1)));
    assert!(registry.add_key_watcher(KEY, session(2)));
    assert!(!registry.add_key_watcher(KEY, session(3)));
    // Already registered sessions are still accepted
    assert!(registry.add_key_watcher(KEY, session(2)));
    // Other keys have their own budget
    assert!(registry.add_key_watcher(OTHER_KEY, session(3)));

    assert_eq!(registry.watcher_count(KEY), 2);
}

#[test]
fn test_remove_session_drops_all_its_entries() {
    let registry = WatcherRegistry::new(16);
    registry.add_key_watcher(KEY, session(1));
    registry.add_key_watcher(OTHER_KEY, session(1));
    registry.add_key_watcher(OTHER_KEY, session(2));

    assert_eq!(registry.remove_session(1), 2);
    assert_eq!(registry.watched_key_count(), 1);
    assert!(registry.contains(2, OTHER_KEY));
    assert_eq!(registry.remove_session(1), 0);
}

#[tokio::test(start_paused = true)]
async fn test_evict_expired_drops_old_and_closed_entries() {
    let registry = WatcherRegistry::new(16);
    let (alive, _alive_rx) = channel_session(1);
    let (closed, closed_rx) = channel_session(2);
    registry.add_key_watcher(KEY, alive.clone());
    registry.add_key_watcher(OTHER_KEY, closed);
    drop(closed_rx);

    assert_eq!(registry.evict_expired(Duration::from_secs(60)), 1);
    assert!(registry.contains(1, KEY));

    tokio::time::advance(Duration::from_secs(61)).await;
    let (fresh, _fresh_rx) = channel_session(3);
    registry.add_key_watcher(KEY, fresh);

    assert_eq!(registry.evict_expired(Duration::from_secs(60)), 1);
    assert!(!registry.contains(1, KEY));
    assert!(registry.contains(3, KEY));
}

#[tokio::test(start_paused = true)]
async fn test_evictor_sweeps_until_shutdown() {
    let registry = Arc::new(WatcherRegistry::new(16));
    let (session, _rx) = channel_session(1);
    registry.add_key_watcher(KEY, session);

    let config = WatchConfig {
        watcher_ttl_ms: 1_000,
        eviction_interval_ms: 100,
        ..Default::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = WatcherEvictor::spawn(registry.clone(), &config, shutdown_rx).expect("eviction enabled");

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(registry.watched_key_count(), 0);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[test]
fn test_evictor_not_spawned_without_ttl() {
    let registry = Arc::new(WatcherRegistry::new(16));
    let (_tx, rx) = watch::channel(());

    assert!(WatcherEvictor::spawn(registry, &WatchConfig::default(), rx).is_none());
}

#[test]
fn test_watch_key_registers_only_when_asked() {
    let registry = WatcherRegistry::new(16);

    let registered = registry.watch_key(KEY, session(1), || (false, "reply"), |out, registered| {
        assert_eq!(out, "reply");
        registered
    });
    assert!(!registered);
    assert_eq!(registry.watched_key_count(), 0);

    assert!(registry.watch_key(KEY, session(1), || (true, ()), |(), registered| registered));
    assert!(registry.contains(1, KEY));

    // Existing key, registration declined: the other watcher is untouched
    assert!(!registry.watch_key(KEY, session(2), || (false, ()), |(), registered| registered));
    assert!(registry.contains(1, KEY));
    assert!(!registry.contains(2, KEY));
}

#[test]
fn test_watch_key_reports_limit_to_then() {
    let registry = WatcherRegistry::new(1);
    registry.add_key_watcher(KEY, session(1));

    let registered = registry.watch_key(KEY, session(2), || (true, ()), |(), registered| registered);
    assert!(!registered);
    assert_eq!(registry.watcher_count(KEY), 1);
}

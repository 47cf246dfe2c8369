use watch_range::EventType;
use watch_range::FunctionKind;
use watch_range::KeyCodec;
use watch_range::PureGetRequest;
use watch_range::RangeError;
use watch_range::ResponseKind;
use watch_range::StatusCode;
use watch_range::WatchDeleteRequest;
use watch_range::WatchGetRequest;
use watch_range::WatchPutRequest;

use crate::common::drain;
use crate::common::header;
use crate::common::kv;
use crate::common::meta;
use crate::common::session;
use crate::common::LocalCluster;
use crate::enable_logger;

#[test]
fn test_only_originator_replies_across_replicas() {
    enable_logger();
    let cluster = LocalCluster::new(3);
    let (client, mut rx) = session(100);

    for i in 0..4 {
        cluster.node(1).watch_put(
            client.clone(),
            WatchPutRequest {
                header: header(),
                kv: kv("foo", &format!("v{}", i)),
            },
        );
    }
    assert_eq!(cluster.replicate(), 4);

    let replies = drain(&mut rx);
    assert_eq!(replies.len(), 4);
    assert!(replies.iter().all(|r| r.is_ok() && r.kind == ResponseKind::WatchPut));

    // Every replica holds the same record
    let key = KeyCodec::encode_key(&meta(), &kv("foo", "")).unwrap();
    for replica in &cluster.replicas {
        let stored = replica.storage().get(&key).unwrap().expect("replicated");
        let record = KeyCodec::decode(FunctionKind::PureGet, &meta(), &key, &stored).unwrap();
        assert_eq!(record.value, b"v3".to_vec());
        assert_eq!(record.version, 4);
        assert_eq!(replica.pending_replies(), 0);
    }
}

#[test]
fn test_followers_redirect_clients() {
    let cluster = LocalCluster::new(3);
    let (client, mut rx) = session(100);

    cluster.node(2).pure_get(
        client.clone(),
        PureGetRequest {
            header: header(),
            kv: kv("foo", ""),
            prefix: false,
        },
    );
    cluster.node(3).watch_put(
        client.clone(),
        WatchPutRequest {
            header: header(),
            kv: kv("foo", "bar"),
        },
    );

    let replies = drain(&mut rx);
    assert_eq!(replies[0].error(), Some(&RangeError::NotLeader { range_id: 1 }));
    assert_eq!(replies[1].error(), Some(&RangeError::NotLeader { range_id: 1 }));
    assert_eq!(cluster.replicate(), 0);
}

#[test]
fn test_watch_fires_on_replica_that_registered_it() {
    let cluster = LocalCluster::new(3);
    let (writer, mut writer_rx) = session(100);
    let (watcher, mut watcher_rx) = session(200);

    cluster.node(1).watch_put(
        writer.clone(),
        WatchPutRequest {
            header: header(),
            kv: kv("foo", "bar"),
        },
    );
    cluster.replicate();
    cluster.node(1).watch_get(
        watcher.clone(),
        WatchGetRequest {
            header: header(),
            kv: kv("foo", ""),
            start_version: 1,
        },
    );
    assert_eq!(drain(&mut watcher_rx).len(), 1);

    // Node 1 applies every entry, so its watcher fires for a delete
    // proposed through node 2.
    cluster.transfer_leadership(2);
    cluster.node(2).watch_delete(
        writer.clone(),
        WatchDeleteRequest {
            header: header(),
            kv: kv("foo", ""),
        },
    );
    cluster.replicate();

    let replies = drain(&mut writer_rx);
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().all(|r| r.code == StatusCode::Ok.code()));

    let notes = drain(&mut watcher_rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, ResponseKind::Notify);
    assert_eq!(notes[0].events[0].event_type, EventType::Delete);
    assert_eq!(notes[0].events[0].kv.version, 1);
    assert_eq!(cluster.node(1).registry().watched_key_count(), 0);
}

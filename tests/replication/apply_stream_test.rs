use tokio::sync::mpsc;
use tokio::sync::watch;
use watch_range::ApplyLoop;
use watch_range::EventType;
use watch_range::ResponseKind;
use watch_range::WatchGetRequest;
use watch_range::WatchPutRequest;

use crate::common::header;
use crate::common::kv;
use crate::common::session;
use crate::common::LocalCluster;

#[tokio::test]
async fn test_apply_streams_drive_replies_and_notifications() {
    let cluster = LocalCluster::new(3);
    let (shutdown_tx, _) = watch::channel(());

    let mut streams = Vec::new();
    let mut handles = Vec::new();
    for replica in &cluster.replicas {
        let (tx, rx) = mpsc::unbounded_channel();
        streams.push(tx);
        handles.push(ApplyLoop::new(replica.clone(), rx, shutdown_tx.subscribe()).spawn());
    }

    let (writer, mut writer_rx) = session(100);
    let (watcher, mut watcher_rx) = session(200);

    cluster.node(1).watch_put(
        writer.clone(),
        WatchPutRequest {
            header: header(),
            kv: kv("foo", "bar"),
        },
    );
    cluster.replicate_to(&streams);
    let reply = writer_rx.recv().await.unwrap();
    assert_eq!(reply.code, 0);
    assert_eq!(reply.events[0].kv.version, 1);

    cluster.node(1).watch_get(
        watcher.clone(),
        WatchGetRequest {
            header: header(),
            kv: kv("foo", ""),
            start_version: 1,
        },
    );
    assert_eq!(watcher_rx.recv().await.unwrap().kind, ResponseKind::WatchGet);

    cluster.node(1).watch_put(
        writer.clone(),
        WatchPutRequest {
            header: header(),
            kv: kv("foo", "baz"),
        },
    );
    cluster.replicate_to(&streams);

    let note = watcher_rx.recv().await.unwrap();
    assert_eq!(note.kind, ResponseKind::Notify);
    assert_eq!(note.events[0].event_type, EventType::Put);
    assert_eq!(note.events[0].kv.value, b"baz".to_vec());
    assert_eq!(note.events[0].kv.version, 2);
    assert_eq!(writer_rx.recv().await.unwrap().events[0].kv.version, 2);

    shutdown_tx.send(()).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }
}

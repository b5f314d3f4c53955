//! Torrent-by-url cascade: metafile download, then the torrent itself.

mod common;

use std::sync::{Arc, Mutex};

use ariabridge_client::DownloadClient;
use ariabridge_core::{ClientError, Gid, LifecycleStage, Notification, NotificationMethod, RpcMethod};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::{FakeChannel, eventually};
use serde_json::{Value, json};

const URL: &str = "http://example.org/ubuntu.torrent";
const METAFILE: &[u8] = b"d8:announce35:udp://tracker.example.org:1337e";

fn note(method: NotificationMethod, gid: &str) -> Notification {
    Notification::new(method, gid)
}

/// Engine that serves the metafile as gid `meta` saved at `path`, and
/// accepts the torrent as gid `real`.
fn cascade_engine(path: String) -> Arc<FakeChannel> {
    let channel = FakeChannel::new();
    channel.reply(RpcMethod::AddUri, json!("meta"));
    channel.reply(RpcMethod::AddTorrent, json!("real"));
    channel.reply(RpcMethod::RemoveDownloadResult, json!("OK"));
    channel.on(RpcMethod::TellStatus, move |params: &[Value]| {
        if params[0] == json!("meta") {
            Ok(json!({
                "gid": "meta",
                "status": "complete",
                "files": [{"index": "1", "path": path, "length": "47",
                           "completedLength": "47", "selected": "true", "uris": []}]
            }))
        } else {
            Ok(json!({"gid": params[0], "status": "active"}))
        }
    });
    channel
}

#[tokio::test]
async fn test_completed_metafile_is_resubmitted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ubuntu.torrent");
    std::fs::write(&path, METAFILE).unwrap();
    let path = path.to_string_lossy().into_owned();

    let channel = cascade_engine(path.clone());
    let client = DownloadClient::new(channel.clone());

    let gid = client.add_torrent_url(URL).await.unwrap();
    assert_eq!(gid, Gid::from("meta"));
    assert!(client.history().contains(URL));
    assert_eq!(client.watcher().subscription_count(), 2);

    // Someone else's completion is ignored
    client
        .watcher()
        .dispatch(note(NotificationMethod::DownloadComplete, "unrelated"))
        .await;
    assert_eq!(client.watcher().subscription_count(), 2);

    client
        .watcher()
        .dispatch(note(NotificationMethod::DownloadComplete, "meta"))
        .await;
    assert!(
        eventually(|| channel.calls_of(RpcMethod::AddTorrent).len() == 1).await,
        "torrent was never submitted"
    );
    assert!(eventually(|| client.history().contains(&path)).await);

    assert_eq!(
        channel.calls_of(RpcMethod::AddTorrent),
        vec![vec![json!(BASE64.encode(METAFILE))]]
    );
    assert_eq!(
        channel.calls_of(RpcMethod::RemoveDownloadResult),
        vec![vec![json!("meta")]]
    );
    assert!(!client.history().contains(URL));
    assert_eq!(client.history().get(&path).unwrap().gid, Some(Gid::from("real")));

    // Exactly one subscription remains: the torrent's own
    assert_eq!(client.watcher().subscription_count(), 1);

    // Stray late notifications for the metafile fire nothing
    client
        .watcher()
        .dispatch(note(NotificationMethod::DownloadComplete, "meta"))
        .await;
    client
        .watcher()
        .dispatch(note(NotificationMethod::DownloadError, "meta"))
        .await;
    assert_eq!(channel.calls_of(RpcMethod::AddTorrent).len(), 1);
    assert_eq!(client.watcher().subscription_count(), 1);
}

#[tokio::test]
async fn test_metafile_error_is_reported() {
    let channel = cascade_engine("/unused".to_string());
    let client = DownloadClient::new(channel.clone());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&errors);
    client.events().add_listener(LifecycleStage::Error, move |args| {
        log.lock().unwrap().push(args.locator.clone());
    });

    client.add_torrent_url(URL).await.unwrap();
    client
        .watcher()
        .dispatch(note(NotificationMethod::DownloadError, "meta"))
        .await;

    assert!(eventually(|| errors.lock().unwrap().len() == 1).await);
    assert_eq!(errors.lock().unwrap()[0], URL);
    assert_eq!(client.watcher().subscription_count(), 0);
    assert!(!client.history().contains(URL));
    assert!(channel.calls_of(RpcMethod::AddTorrent).is_empty());
}

#[tokio::test]
async fn test_missing_metafile_reports_error() {
    let channel = cascade_engine("/no/such/dir/ubuntu.torrent".to_string());
    let client = DownloadClient::new(channel.clone());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&errors);
    client.events().add_listener(LifecycleStage::Error, move |args| {
        log.lock().unwrap().push(args.gid().clone());
    });

    client.add_torrent_url(URL).await.unwrap();
    client
        .watcher()
        .dispatch(note(NotificationMethod::DownloadComplete, "meta"))
        .await;

    assert!(eventually(|| errors.lock().unwrap().len() == 1).await);
    assert_eq!(errors.lock().unwrap()[0], Gid::from("meta"));
    assert!(channel.calls_of(RpcMethod::AddTorrent).is_empty());
    assert_eq!(client.watcher().subscription_count(), 0);
}

#[tokio::test]
async fn test_rejected_torrent_url_unsubscribes_group() {
    let channel = FakeChannel::new();
    channel.on(RpcMethod::AddUri, |_| Err(ClientError::engine(1, "bad uri")));
    let client = DownloadClient::new(channel);

    let err = client.add_torrent_url(URL).await.unwrap_err();
    assert!(err.is_engine());
    assert_eq!(client.watcher().subscription_count(), 0);
    assert!(client.history().is_empty());
}

//! End-to-end correlation tests: notifications in, callbacks out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ariabridge_core::{
    ClientError, ClientResult, DownloadStatus, Enrichment, Gid, LifecycleStage, Notification,
    NotificationMethod, SnapshotBuilder, StatusTag,
};
use ariabridge_watcher::{
    DownloadHandlers, DownloadPhase, DownloadWatch, GidCell, Handling, SubscriptionSet, Watcher,
    notification_channel, spawn_progress_ticker, spawn_pump,
};
use async_trait::async_trait;
use mockall::mock;
use tokio_test::assert_pending;
use tokio_test::task;
use tokio_util::sync::CancellationToken;

mock! {
    pub Builder {}

    #[async_trait]
    impl SnapshotBuilder for Builder {
        async fn build(&self, gid: &Gid) -> ClientResult<DownloadStatus>;
    }
}

/// Builder reporting `active` with a fixed completed length.
struct ActiveBuilder;

#[async_trait]
impl SnapshotBuilder for ActiveBuilder {
    async fn build(&self, gid: &Gid) -> ClientResult<DownloadStatus> {
        Ok(DownloadStatus {
            gid: gid.clone(),
            status: StatusTag::Active,
            total_length: 100,
            completed_length: 40,
            ..DownloadStatus::default()
        })
    }
}

struct BrokenEnrichment;

#[async_trait]
impl Enrichment for BrokenEnrichment {
    async fn enrich(&self, _snapshot: &DownloadStatus) -> ClientResult<DownloadStatus> {
        Err(ClientError::invalid_response("missing field"))
    }
}

type Events = Arc<Mutex<Vec<(String, LifecycleStage, Gid)>>>;

fn recording(events: &Events) -> DownloadHandlers {
    let mut handlers = DownloadHandlers::new();
    for stage in LifecycleStage::ALL {
        let events = Arc::clone(events);
        handlers = handlers.on(stage, move |args| {
            events
                .lock()
                .unwrap()
                .push((args.locator.clone(), stage, args.gid().clone()));
        });
    }
    handlers
}

fn stages(events: &Events) -> Vec<LifecycleStage> {
    events.lock().unwrap().iter().map(|(_, s, _)| *s).collect()
}

fn watch_for(locator: &str, cell: &GidCell, events: &Events) -> DownloadWatch {
    DownloadWatch::new(locator, cell.resolver(), Arc::new(ActiveBuilder)).with_handlers(recording(events))
}

fn note(method: NotificationMethod, gid: &str) -> Notification {
    Notification::new(method, gid)
}

#[tokio::test]
async fn test_two_downloads_full_lifecycle() {
    let watcher = Watcher::new();
    let events = Events::default();

    let cell_a = GidCell::new();
    let cell_b = GidCell::new();
    let a = watcher.subscribe_download(watch_for("L1", &cell_a, &events)).detach();
    let b = watcher.subscribe_download(watch_for("L2", &cell_b, &events)).detach();
    cell_a.set(Gid::from("A"));
    cell_b.set(Gid::from("B"));
    watcher.history().add("L1", Gid::from("A")).unwrap();
    watcher.history().add("L2", Gid::from("B")).unwrap();

    watcher.dispatch(note(NotificationMethod::DownloadStart, "A")).await;
    watcher.dispatch(note(NotificationMethod::DownloadStart, "B")).await;
    watcher.dispatch(note(NotificationMethod::DownloadPause, "A")).await;
    watcher.dispatch(note(NotificationMethod::DownloadComplete, "B")).await;
    watcher.dispatch(note(NotificationMethod::DownloadStart, "A")).await;
    watcher.dispatch(note(NotificationMethod::DownloadComplete, "A")).await;

    let seen = events.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("L1".to_string(), LifecycleStage::Started, Gid::from("A")),
            ("L2".to_string(), LifecycleStage::Started, Gid::from("B")),
            ("L1".to_string(), LifecycleStage::Paused, Gid::from("A")),
            ("L2".to_string(), LifecycleStage::Completed, Gid::from("B")),
            ("L1".to_string(), LifecycleStage::Started, Gid::from("A")),
            ("L1".to_string(), LifecycleStage::Completed, Gid::from("A")),
        ]
    );
    assert!(!watcher.is_subscribed(a));
    assert!(!watcher.is_subscribed(b));
    assert!(watcher.history().is_empty());
}

#[tokio::test]
async fn test_terminal_delivered_once() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("g"));
    let _handle = watcher.subscribe_download(watch_for("L", &cell, &events));

    watcher.dispatch(note(NotificationMethod::DownloadComplete, "g")).await;
    watcher.dispatch(note(NotificationMethod::BtDownloadComplete, "g")).await;
    watcher.dispatch(note(NotificationMethod::DownloadError, "g")).await;
    watcher.dispatch(note(NotificationMethod::DownloadStart, "g")).await;

    assert_eq!(stages(&events), vec![LifecycleStage::Completed]);
    assert_eq!(watcher.subscription_count(), 0);
}

#[tokio::test]
async fn test_concurrent_terminals_deliver_once() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("g"));
    let _handle = watcher.subscribe_download(watch_for("L", &cell, &events));

    let mut tasks = Vec::new();
    for method in [
        NotificationMethod::DownloadComplete,
        NotificationMethod::DownloadError,
        NotificationMethod::DownloadStop,
        NotificationMethod::BtDownloadComplete,
    ] {
        let watcher = watcher.clone();
        tasks.push(tokio::spawn(async move {
            watcher.dispatch(note(method, "g")).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let terminal: Vec<_> = stages(&events)
        .into_iter()
        .filter(LifecycleStage::is_terminal)
        .collect();
    assert_eq!(terminal.len(), 1);
}

#[tokio::test]
async fn test_paused_is_not_terminal() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("g"));
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();

    watcher.dispatch(note(NotificationMethod::DownloadPause, "g")).await;
    assert!(watcher.is_subscribed(token));

    watcher.dispatch(note(NotificationMethod::DownloadStart, "g")).await;
    assert_eq!(
        stages(&events),
        vec![LifecycleStage::Paused, LifecycleStage::Started]
    );
}

#[tokio::test]
async fn test_unknown_gid_is_ignored() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("mine"));
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();

    watcher.dispatch(note(NotificationMethod::DownloadComplete, "someone-else")).await;

    assert!(events.lock().unwrap().is_empty());
    assert!(watcher.is_subscribed(token));
}

#[tokio::test]
async fn test_unsubscribe_idempotent() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("g"));
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();

    assert!(watcher.unsubscribe(token));
    assert!(!watcher.unsubscribe(token));

    let set: SubscriptionSet = std::iter::once(token).collect();
    assert_eq!(watcher.unsubscribe_all(&set), 0);

    watcher.dispatch(note(NotificationMethod::DownloadStart, "g")).await;
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_before_gid_is_replayed() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();

    // Engine reports the start before the submitting command has answered
    watcher.dispatch(note(NotificationMethod::DownloadStart, "g")).await;
    assert!(events.lock().unwrap().is_empty());

    cell.set(Gid::from("g"));
    assert!(watcher.replay_pending(token).await);
    assert_eq!(stages(&events), vec![LifecycleStage::Started]);

    // Nothing left to replay
    assert!(!watcher.replay_pending(token).await);
}

#[tokio::test]
async fn test_buffered_start_precedes_later_pause() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();

    watcher.dispatch(note(NotificationMethod::DownloadStart, "g")).await;
    cell.set(Gid::from("g"));

    // The pause reaches the watcher before the submitter gets to replay
    watcher.dispatch(note(NotificationMethod::DownloadPause, "g")).await;
    assert!(!watcher.replay_pending(token).await);

    assert_eq!(stages(&events), vec![LifecycleStage::Started, LifecycleStage::Paused]);
    assert_eq!(watcher.phase(token), Some(DownloadPhase::Paused));
}

#[tokio::test]
async fn test_every_buffered_notification_is_replayed_in_order() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();
    watcher.history().reserve("L").unwrap();

    watcher.dispatch(note(NotificationMethod::DownloadStart, "g")).await;
    watcher.dispatch(note(NotificationMethod::DownloadStart, "someone-else")).await;
    watcher.dispatch(note(NotificationMethod::DownloadComplete, "g")).await;
    assert!(events.lock().unwrap().is_empty());

    watcher.history().confirm("L", Gid::from("g"));
    cell.set(Gid::from("g"));
    assert!(watcher.replay_pending(token).await);

    assert_eq!(stages(&events), vec![LifecycleStage::Started, LifecycleStage::Completed]);
    assert!(!watcher.is_subscribed(token));
    assert!(watcher.history().is_empty());
}

#[tokio::test]
async fn test_replayed_terminal_retires_subscription() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    let token = watcher.subscribe_download(watch_for("L", &cell, &events)).detach();

    watcher.dispatch(note(NotificationMethod::DownloadError, "g")).await;
    cell.set(Gid::from("g"));
    watcher.history().add("L", Gid::from("g")).unwrap();

    assert!(watcher.replay_pending(token).await);
    assert_eq!(stages(&events), vec![LifecycleStage::Error]);
    assert!(!watcher.is_subscribed(token));
    assert!(!watcher.history().contains("L"));
}

#[tokio::test]
async fn test_history_kept_for_newer_submission() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("old"));
    let _handle = watcher.subscribe_download(watch_for("L", &cell, &events));
    watcher.history().add("L", Gid::from("new")).unwrap();

    watcher.dispatch(note(NotificationMethod::DownloadStop, "old")).await;

    assert_eq!(stages(&events), vec![LifecycleStage::Stopped]);
    assert_eq!(watcher.history().get("L").unwrap().gid, Some(Gid::from("new")));
}

#[tokio::test]
async fn test_method_subscription_filters_by_gid() {
    let watcher = Watcher::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let target = Gid::from("meta");

    let log = Arc::clone(&seen);
    let token = watcher
        .subscribe_method(NotificationMethod::DownloadComplete, move |gid| {
            log.lock().unwrap().push(gid.clone());
            if *gid == target {
                Handling::Handled
            } else {
                Handling::Ignored
            }
        })
        .detach();

    watcher.dispatch(note(NotificationMethod::DownloadComplete, "other")).await;
    assert!(watcher.is_subscribed(token));

    watcher.dispatch(note(NotificationMethod::DownloadStart, "meta")).await;
    watcher.dispatch(note(NotificationMethod::DownloadComplete, "meta")).await;
    assert!(!watcher.is_subscribed(token));

    watcher.dispatch(note(NotificationMethod::DownloadComplete, "meta")).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Gid::from("other"), Gid::from("meta")]
    );
}

#[tokio::test]
async fn test_unsubscribe_all_removes_group() {
    let watcher = Watcher::new();
    let mut keys = SubscriptionSet::new();
    keys.push(
        watcher
            .subscribe_method(NotificationMethod::DownloadError, |_| Handling::Ignored)
            .detach(),
    );
    keys.push(
        watcher
            .subscribe_method(NotificationMethod::DownloadComplete, |_| Handling::Ignored)
            .detach(),
    );

    assert_eq!(watcher.unsubscribe_all(&keys), 2);
    assert_eq!(watcher.subscription_count(), 0);
    assert_eq!(watcher.unsubscribe_all(&keys), 0);
}

#[tokio::test]
async fn test_callback_may_resubscribe_during_terminal() {
    let watcher = Watcher::new();
    let follow_up = Arc::new(Mutex::new(None));
    let cell = GidCell::new();
    cell.set(Gid::from("g"));

    let inner = watcher.clone();
    let slot = Arc::clone(&follow_up);
    let handlers = DownloadHandlers::new().on_completed(move |_| {
        let next = GidCell::new();
        let token = inner
            .subscribe_download(DownloadWatch::new("L-next", next.resolver(), Arc::new(ActiveBuilder)))
            .detach();
        *slot.lock().unwrap() = Some(token);
    });
    let _handle = watcher.subscribe_download(
        DownloadWatch::new("L", cell.resolver(), Arc::new(ActiveBuilder)).with_handlers(handlers),
    );

    watcher.dispatch(note(NotificationMethod::DownloadComplete, "g")).await;

    let token = follow_up.lock().unwrap().expect("callback ran");
    assert!(watcher.is_subscribed(token));
    assert_eq!(watcher.subscription_count(), 1);
}

#[tokio::test]
async fn test_enrichment_failure_delivers_unenriched() {
    let watcher = Watcher::new();
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let cell = GidCell::new();
    cell.set(Gid::from("g"));

    let mut builder = MockBuilder::new();
    builder.expect_build().times(1).returning(|gid| {
        Ok(DownloadStatus {
            gid: gid.clone(),
            status: StatusTag::Active,
            download_speed: 2048,
            ..DownloadStatus::default()
        })
    });

    let log = Arc::clone(&snapshots);
    let _handle = watcher.subscribe_download(
        DownloadWatch::new("L", cell.resolver(), Arc::new(builder))
            .with_enrichment(Arc::new(BrokenEnrichment))
            .with_handlers(DownloadHandlers::new().on_progress(move |args| {
                log.lock().unwrap().push(args.status.clone());
            })),
    );

    watcher.dispatch(note(NotificationMethod::ProgressPoll, "g")).await;

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].download_speed, 2048);
}

#[tokio::test]
async fn test_pump_preserves_order() {
    let watcher = Watcher::new();
    let events = Events::default();
    let cell = GidCell::new();
    cell.set(Gid::from("g"));
    let _handle = watcher.subscribe_download(watch_for("L", &cell, &events));

    let (tx, rx) = notification_channel();
    let cancel = CancellationToken::new();
    let pump = spawn_pump(watcher.clone(), rx, cancel.clone());

    for method in [
        NotificationMethod::DownloadStart,
        NotificationMethod::DownloadPause,
        NotificationMethod::DownloadStart,
        NotificationMethod::DownloadComplete,
    ] {
        tx.send(note(method, "g")).await.unwrap();
    }
    drop(tx);
    pump.await.unwrap();

    assert_eq!(
        stages(&events),
        vec![
            LifecycleStage::Started,
            LifecycleStage::Paused,
            LifecycleStage::Started,
            LifecycleStage::Completed,
        ]
    );
}

#[tokio::test]
async fn test_pump_stops_on_cancel() {
    let watcher = Watcher::new();
    let (_tx, rx) = notification_channel();
    let cancel = CancellationToken::new();
    let pump = spawn_pump(watcher, rx, cancel.clone());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), pump)
        .await
        .expect("pump exits")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ticker_polls_only_running_downloads() {
    let watcher = Watcher::new();
    let events = Events::default();

    let running = GidCell::new();
    running.set(Gid::from("run"));
    let paused = GidCell::new();
    paused.set(Gid::from("idle"));
    let _a = watcher.subscribe_download(watch_for("L-run", &running, &events));
    let _b = watcher.subscribe_download(watch_for("L-idle", &paused, &events));

    watcher.dispatch(note(NotificationMethod::DownloadStart, "run")).await;
    watcher.dispatch(note(NotificationMethod::DownloadStart, "idle")).await;
    watcher.dispatch(note(NotificationMethod::DownloadPause, "idle")).await;
    events.lock().unwrap().clear();

    let (tx, mut rx) = notification_channel();
    let cancel = CancellationToken::new();
    let ticker = spawn_progress_ticker(watcher.clone(), tx, Duration::from_secs(1), cancel.clone());

    let first = rx.recv().await.unwrap();
    assert_eq!(first, note(NotificationMethod::ProgressPoll, "run"));

    // Nothing more until the next tick
    {
        let mut next = task::spawn(rx.recv());
        assert_pending!(next.poll());
    }

    watcher.dispatch(first).await;
    let seen = events.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![("L-run".to_string(), LifecycleStage::Progress, Gid::from("run"))]
    );

    cancel.cancel();
    ticker.await.unwrap();
}

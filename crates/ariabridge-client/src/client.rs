//! The download client facade.
//!
//! Download-initiating operations wire a subscription to the [`EventHub`]
//! before the command is sent, so notifications racing the command's reply
//! are buffered instead of lost. Control operations issue one command and
//! return its result.

use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};

use ariabridge_core::{
    ClientError, ClientResult, CommandChannel, DownloadEventArgs, DownloadStatus, Gid,
    LifecycleStage, NotificationMethod, RpcMethod,
};
use ariabridge_watcher::{
    DownloadHandlers, DownloadWatch, GidCell, Handling, HistoryStore, SubscriptionSet, Watcher,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::events::EventHub;
use crate::poller::{FullStatusBuilder, ProgressEnrichment, StatusPoller};

/// Engine version and compiled-in features.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineVersion {
    pub version: String,
    #[serde(default)]
    pub enabled_features: Vec<String>,
}

struct ClientInner {
    channel: Arc<dyn CommandChannel>,
    watcher: Watcher,
    poller: StatusPoller,
    events: Arc<EventHub>,
}

/// Submits downloads, controls them, and reports their lifecycle.
///
/// Cheap to clone; clones share the watcher, history and listeners.
#[derive(Clone)]
pub struct DownloadClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for DownloadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadClient")
            .field("watcher", &self.inner.watcher)
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}

impl DownloadClient {
    /// Create a client with a fresh watcher.
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self::with_watcher(channel, Watcher::new())
    }

    /// Create a client around an existing watcher, typically one already fed
    /// by a notification pump.
    pub fn with_watcher(channel: Arc<dyn CommandChannel>, watcher: Watcher) -> Self {
        let poller = StatusPoller::new(Arc::clone(&channel));
        Self {
            inner: Arc::new(ClientInner {
                channel,
                watcher,
                poller,
                events: Arc::new(EventHub::new()),
            }),
        }
    }

    /// Listener registry for the six lifecycle events.
    pub fn events(&self) -> &Arc<EventHub> {
        &self.inner.events
    }

    /// The correlator this client subscribes on.
    pub fn watcher(&self) -> &Watcher {
        &self.inner.watcher
    }

    /// In-flight submissions by locator.
    pub fn history(&self) -> &Arc<HistoryStore> {
        self.inner.watcher.history()
    }

    /// Status queries.
    pub fn poller(&self) -> &StatusPoller {
        &self.inner.poller
    }

    // ========================================================================
    // Submissions
    // ========================================================================

    /// Download `url`.
    pub async fn add_url(&self, url: &str) -> ClientResult<Gid> {
        info!(target: "ariabridge.client", url, "Adding url");
        self.submit(url, RpcMethod::AddUri, vec![json!([url])]).await
    }

    /// Download the torrent described by `torrent`. `path` is the locator
    /// events report.
    pub async fn add_torrent(&self, torrent: &[u8], path: &str) -> ClientResult<Gid> {
        info!(target: "ariabridge.client", path, bytes = torrent.len(), "Adding torrent");
        let encoded = BASE64.encode(torrent);
        self.submit(path, RpcMethod::AddTorrent, vec![json!(encoded)])
            .await
    }

    /// Read a `.torrent` file from disk and submit it.
    pub async fn add_torrent_file(&self, path: impl AsRef<Path>) -> ClientResult<Gid> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::from_io_error(&e))?;
        self.add_torrent(&bytes, &path.to_string_lossy()).await
    }

    /// Fetch the `.torrent` at `url`, then download what it describes.
    ///
    /// The metafile download is tracked by name-keyed subscriptions filtered
    /// to its gid. When it completes, those subscriptions are removed, its
    /// result record is dropped and the file is resubmitted through
    /// [`add_torrent`](Self::add_torrent). Events for the metafile itself are
    /// only emitted on error.
    pub async fn add_torrent_url(&self, url: &str) -> ClientResult<Gid> {
        info!(target: "ariabridge.client", url, "Adding torrent url");
        self.history().reserve(url)?;

        let cell = GidCell::new();
        let keys: Arc<OnceLock<SubscriptionSet>> = Arc::default();
        let mut set = SubscriptionSet::new();

        let weak = Arc::downgrade(&self.inner);
        let (mine, locator, group) = (cell.clone(), url.to_string(), Arc::clone(&keys));
        set.push(
            self.watcher()
                .subscribe_method(NotificationMethod::DownloadError, move |gid| {
                    if mine.get().as_ref() != Some(gid) {
                        return Handling::Ignored;
                    }
                    spawn_cascade(&weak, |client| {
                        client.metafile_failed(locator.clone(), gid.clone(), Arc::clone(&group))
                    });
                    Handling::Handled
                })
                .detach(),
        );

        let weak = Arc::downgrade(&self.inner);
        let (mine, locator, group) = (cell.clone(), url.to_string(), Arc::clone(&keys));
        set.push(
            self.watcher()
                .subscribe_method(NotificationMethod::DownloadComplete, move |gid| {
                    if mine.get().as_ref() != Some(gid) {
                        return Handling::Ignored;
                    }
                    spawn_cascade(&weak, |client| {
                        client.metafile_completed(locator.clone(), gid.clone(), Arc::clone(&group))
                    });
                    Handling::Handled
                })
                .detach(),
        );

        let _ = keys.set(set);

        let gid = match self.command_gid(RpcMethod::AddUri, vec![json!([url])]).await {
            Ok(gid) => gid,
            Err(e) => {
                if let Some(set) = keys.get() {
                    self.watcher().unsubscribe_all(set);
                }
                self.history().release(url);
                warn!(target: "ariabridge.client", url, error = %e, "Torrent url rejected");
                return Err(e);
            }
        };

        self.history().confirm(url, gid.clone());
        cell.set(gid.clone());
        debug!(target: "ariabridge.client", url, %gid, "Fetching torrent metafile");
        Ok(gid)
    }

    async fn metafile_completed(
        self,
        url: String,
        gid: Gid,
        keys: Arc<OnceLock<SubscriptionSet>>,
    ) {
        // Retire the whole group before anything can resubmit
        if let Some(set) = keys.get() {
            self.watcher().unsubscribe_all(set);
        }
        self.history().remove_if(&url, &gid);

        match self.continue_with_metafile(&gid).await {
            Ok(next) => info!(
                target: "ariabridge.client",
                url = %url,
                metafile = %gid,
                %next,
                "Torrent metafile downloaded, torrent submitted"
            ),
            Err(e) => {
                error!(
                    target: "ariabridge.client",
                    url = %url,
                    %gid,
                    error = %e,
                    "Could not continue with torrent metafile"
                );
                let status = DownloadStatus::placeholder(gid, LifecycleStage::Error);
                self.events()
                    .emit(LifecycleStage::Error, &DownloadEventArgs::new(url, status));
            }
        }
    }

    async fn continue_with_metafile(&self, gid: &Gid) -> ClientResult<Gid> {
        let status = self.poller().status(gid).await?;
        self.remove_result_logged(gid).await;

        let path = status
            .primary_path()
            .ok_or_else(|| ClientError::MissingFile { gid: gid.clone() })?
            .to_string();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ClientError::from_io_error(&e))?;
        self.add_torrent(&bytes, &path).await
    }

    async fn metafile_failed(self, url: String, gid: Gid, keys: Arc<OnceLock<SubscriptionSet>>) {
        if let Some(set) = keys.get() {
            self.watcher().unsubscribe_all(set);
        }
        self.history().remove_if(&url, &gid);

        let status = match self.poller().status(&gid).await {
            Ok(status) => status,
            Err(_) => DownloadStatus::placeholder(gid.clone(), LifecycleStage::Error),
        };
        error!(
            target: "ariabridge.client",
            url = %url,
            %gid,
            code = status.error_code().unwrap_or("-"),
            "Torrent metafile download failed"
        );
        self.remove_result_logged(&gid).await;
        self.events()
            .emit(LifecycleStage::Error, &DownloadEventArgs::new(url, status));
    }

    async fn submit(&self, locator: &str, method: RpcMethod, params: Vec<Value>) -> ClientResult<Gid> {
        // Claimed before the command so a concurrent submission of the same
        // locator fails without reaching the engine
        self.history().reserve(locator)?;

        let cell = GidCell::new();
        let watch = DownloadWatch::new(
            locator,
            cell.resolver(),
            Arc::new(FullStatusBuilder::new(self.poller().clone())),
        )
        .with_enrichment(Arc::new(ProgressEnrichment::new(self.poller().clone())))
        .with_handlers(self.handlers());
        let token = self.watcher().subscribe_download(watch).detach();

        let gid = match self.command_gid(method, params).await {
            Ok(gid) => gid,
            Err(e) => {
                self.watcher().unsubscribe(token);
                self.history().release(locator);
                warn!(target: "ariabridge.client", locator, %method, error = %e, "Submission rejected");
                return Err(e);
            }
        };

        self.history().confirm(locator, gid.clone());
        cell.set(gid.clone());
        self.watcher().replay_pending(token).await;

        info!(target: "ariabridge.client", locator, %gid, "Download submitted");
        Ok(gid)
    }

    fn handlers(&self) -> DownloadHandlers {
        let mut handlers = DownloadHandlers::new();
        for stage in LifecycleStage::ALL
            .into_iter()
            .filter(|stage| *stage != LifecycleStage::Error)
        {
            let events = Arc::clone(&self.inner.events);
            handlers = handlers.on(stage, move |args| {
                log_event(stage, args);
                events.emit(stage, args);
            });
        }

        let events = Arc::clone(&self.inner.events);
        let weak = Arc::downgrade(&self.inner);
        handlers.on_error(move |args| {
            log_event(LifecycleStage::Error, args);
            let gid = args.gid().clone();
            spawn_cascade(&weak, move |client| async move {
                client.remove_result_logged(&gid).await;
            });
            events.emit(LifecycleStage::Error, args);
        })
    }

    async fn command_gid(&self, method: RpcMethod, params: Vec<Value>) -> ClientResult<Gid> {
        let value = self.inner.channel.call(method, params).await?;
        as_gid(method, value)
    }

    async fn remove_result_logged(&self, gid: &Gid) {
        if let Err(e) = self.remove(gid).await {
            warn!(target: "ariabridge.client", %gid, error = %e, "Could not remove download result");
        }
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Pause a download without waiting for peers.
    pub async fn pause(&self, gid: &Gid) -> ClientResult<Gid> {
        info!(target: "ariabridge.client", %gid, "Pausing");
        self.command_gid(RpcMethod::ForcePause, vec![json!(gid)]).await
    }

    /// Resume a paused download.
    pub async fn resume(&self, gid: &Gid) -> ClientResult<Gid> {
        info!(target: "ariabridge.client", %gid, "Resuming");
        self.command_gid(RpcMethod::Unpause, vec![json!(gid)]).await
    }

    /// Stop and remove a download.
    pub async fn stop(&self, gid: &Gid) -> ClientResult<Gid> {
        info!(target: "ariabridge.client", %gid, "Stopping");
        self.command_gid(RpcMethod::ForceRemove, vec![json!(gid)]).await
    }

    /// Drop the result record of a finished download.
    pub async fn remove(&self, gid: &Gid) -> ClientResult<()> {
        debug!(target: "ariabridge.client", %gid, "Removing download result");
        self.command_ok(RpcMethod::RemoveDownloadResult, vec![json!(gid)])
            .await
    }

    /// Drop every completed, failed and removed result record.
    pub async fn purge(&self) -> ClientResult<()> {
        info!(target: "ariabridge.client", "Purging finished downloads");
        self.command_ok(RpcMethod::PurgeDownloadResult, Vec::new())
            .await
    }

    /// Shut the engine down immediately.
    pub async fn shutdown(&self) -> ClientResult<()> {
        info!(target: "ariabridge.client", "Requesting engine shutdown");
        self.command_ok(RpcMethod::ForceShutdown, Vec::new()).await
    }

    /// Full status of a download.
    pub async fn status(&self, gid: &Gid) -> ClientResult<DownloadStatus> {
        self.poller().status(gid).await
    }

    /// Progress-only status of a download.
    pub async fn progress(&self, gid: &Gid) -> ClientResult<DownloadStatus> {
        self.poller().progress(gid).await
    }

    /// Change the directory new downloads are saved to.
    pub async fn change_destination_path(&self, dir: impl AsRef<Path>) -> ClientResult<()> {
        let dir = dir.as_ref().to_string_lossy().into_owned();
        info!(target: "ariabridge.client", dir = %dir, "Changing destination directory");
        self.command_ok(RpcMethod::ChangeGlobalOption, vec![json!({ "dir": dir })])
            .await
    }

    /// Engine version.
    pub async fn version(&self) -> ClientResult<EngineVersion> {
        let value = self.inner.channel.call(RpcMethod::GetVersion, Vec::new()).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::invalid_response(format!("bad getVersion reply: {e}")))
    }

    async fn command_ok(&self, method: RpcMethod, params: Vec<Value>) -> ClientResult<()> {
        match self.inner.channel.call(method, params).await? {
            Value::String(reply) if reply == "OK" => Ok(()),
            other => Err(ClientError::invalid_response(format!(
                "{method} answered {other} instead of OK"
            ))),
        }
    }
}

fn as_gid(method: RpcMethod, value: Value) -> ClientResult<Gid> {
    match value {
        Value::String(gid) if !gid.is_empty() => Ok(Gid::new(gid)),
        other => Err(ClientError::invalid_response(format!(
            "{method} answered {other} instead of a gid"
        ))),
    }
}

fn log_event(stage: LifecycleStage, args: &DownloadEventArgs) {
    let gid = args.gid();
    let locator = args.locator.as_str();
    match stage {
        LifecycleStage::Started => info!(target: "ariabridge.client", locator, %gid, "Download started"),
        LifecycleStage::Progress => debug!(
            target: "ariabridge.client",
            locator,
            %gid,
            completed = args.status.completed_length,
            total = args.status.total_length,
            speed = args.status.download_speed,
            "Download progress"
        ),
        LifecycleStage::Paused => info!(target: "ariabridge.client", locator, %gid, "Download paused"),
        LifecycleStage::Completed => info!(target: "ariabridge.client", locator, %gid, "Download completed"),
        LifecycleStage::Error => error!(
            target: "ariabridge.client",
            locator,
            %gid,
            code = args.status.error_code().unwrap_or("-"),
            message = args.status.error_message.as_deref().unwrap_or(""),
            "Download failed"
        ),
        LifecycleStage::Stopped => info!(target: "ariabridge.client", locator, %gid, "Download stopped and removed"),
    }
}

/// Run follow-up work from a synchronous callback.
///
/// Callbacks run on the dispatch path and must not block on commands, so the
/// work is spawned. Nothing happens if the client is gone or there is no
/// runtime.
fn spawn_cascade<F, Fut>(weak: &Weak<ClientInner>, work: F)
where
    F: FnOnce(DownloadClient) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let Some(inner) = weak.upgrade() else {
        debug!(target: "ariabridge.client", "Client dropped, skipping follow-up");
        return;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(target: "ariabridge.client", "No async runtime, skipping follow-up");
        return;
    };
    runtime.spawn(work(DownloadClient { inner }));
}

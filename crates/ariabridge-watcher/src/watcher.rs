//! The notification correlator.
//!
//! Every push notification is matched against the registry and delivered to
//! each interested subscription:
//!
//! 1. Collect matches under the registry lock, buffering the notification for
//!    subscriptions whose gid is not yet known. A subscription resolved since
//!    then is handed its buffered notifications ahead of this one.
//! 2. For download-keyed matches, poll a snapshot and run it through the
//!    optional enrichment. Neither step holds the lock.
//! 3. Terminal stages retire the subscription *before* the callback runs and
//!    clear the locator's history entry. A subscription retired by a racing
//!    delivery is skipped, so each one sees at most one terminal callback.
//! 4. Non-terminal stages re-check liveness and record the phase, then invoke
//!    the callback.
//!
//! Dispatch and replay run one at a time, so a subscription sees its
//! notifications in the order the engine sent them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use ariabridge_core::{DownloadEventArgs, DownloadStatus, Gid, Notification, NotificationMethod};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::history::HistoryStore;
use crate::registry::{DownloadPhase, Match, Registry};
use crate::subscription::{
    DownloadWatch, Handling, MethodCallback, SubscriptionSet, SubscriptionToken,
};

pub(crate) struct WatcherInner {
    registry: Mutex<Registry>,
    /// Held for a whole dispatch or replay.
    delivery: AsyncMutex<()>,
    history: Arc<HistoryStore>,
    next_token: AtomicU64,
}

impl WatcherInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.registry().remove(token)
    }
}

/// Correlates engine notifications with registered subscriptions.
///
/// Cheap to clone; clones share the same registry and history store.
#[derive(Clone)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("subscriptions", &self.subscription_count())
            .field("history", &self.inner.history.len())
            .finish()
    }
}

impl Watcher {
    /// Create a watcher with its own history store.
    pub fn new() -> Self {
        Self::with_history(Arc::new(HistoryStore::new()))
    }

    /// Create a watcher that clears entries of a shared history store.
    pub fn with_history(history: Arc<HistoryStore>) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                registry: Mutex::new(Registry::default()),
                delivery: AsyncMutex::new(()),
                history,
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// The history store terminal deliveries clean up.
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.inner.history
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry()
    }

    fn next_token(&self) -> SubscriptionToken {
        SubscriptionToken::new(self.inner.next_token.fetch_add(1, Ordering::Relaxed))
    }

    fn handle(&self, token: SubscriptionToken) -> SubscriptionHandle {
        SubscriptionHandle {
            token,
            watcher: Arc::downgrade(&self.inner),
            armed: true,
        }
    }

    /// Register a download-keyed subscription.
    pub fn subscribe_download(&self, watch: DownloadWatch) -> SubscriptionHandle {
        let token = self.next_token();
        debug!(
            target: "ariabridge.watcher",
            %token,
            locator = %watch.locator,
            "Download subscription registered"
        );
        self.registry().insert_download(token, watch);
        self.handle(token)
    }

    /// Register a name-keyed subscription that sees every notification
    /// carrying `method`, whatever its gid.
    ///
    /// The subscription is retired the first time the callback returns
    /// [`Handling::Handled`] for a terminal method.
    pub fn subscribe_method<F>(&self, method: NotificationMethod, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Gid) -> Handling + Send + Sync + 'static,
    {
        let token = self.next_token();
        debug!(target: "ariabridge.watcher", %token, %method, "Method subscription registered");
        let callback: MethodCallback = Arc::new(callback);
        self.registry().insert_method(token, method, callback);
        self.handle(token)
    }

    /// Remove a subscription. Unknown or already-retired tokens are a no-op.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let removed = self.inner.unsubscribe(token);
        if removed {
            debug!(target: "ariabridge.watcher", %token, "Unsubscribed");
        }
        removed
    }

    /// Remove every subscription in `tokens`. Returns how many were live.
    pub fn unsubscribe_all(&self, tokens: &SubscriptionSet) -> usize {
        let mut registry = self.registry();
        tokens.iter().filter(|token| registry.remove(**token)).count()
    }

    /// Whether `token` is still registered.
    pub fn is_subscribed(&self, token: SubscriptionToken) -> bool {
        self.registry().contains(token)
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry().len()
    }

    /// Phase of a download-keyed subscription.
    pub fn phase(&self, token: SubscriptionToken) -> Option<DownloadPhase> {
        self.registry().phase(token)
    }

    /// Gids of downloads that have started and are not paused.
    pub fn running_gids(&self) -> Vec<Gid> {
        self.registry().running_gids()
    }

    /// Deliver one notification to every interested subscription.
    ///
    /// Notifications matching nothing are dropped. Callbacks run while the
    /// delivery lock is held and must not wait on another dispatch.
    pub async fn dispatch(&self, notification: Notification) {
        let _delivering = self.inner.delivery.lock().await;
        let matched = self.registry().matches(&notification);
        if matched.is_empty() {
            trace!(
                target: "ariabridge.watcher",
                method = %notification.method,
                gid = %notification.gid,
                "No subscription matched"
            );
            return;
        }

        for found in matched {
            match found {
                Match::Method { token, callback } => {
                    self.deliver_method(token, &callback, &notification);
                }
                Match::Download {
                    token,
                    watch,
                    notification,
                } => {
                    self.deliver(token, &watch, &notification).await;
                }
            }
        }
    }

    /// Redeliver the notifications buffered while `token`'s gid was unknown,
    /// oldest first.
    ///
    /// Call after resolving the gid. Returns true if something was replayed.
    /// A dispatch that ran in between has already delivered them.
    pub async fn replay_pending(&self, token: SubscriptionToken) -> bool {
        let _delivering = self.inner.delivery.lock().await;
        let pending = self.registry().take_pending(token);
        let Some((watch, notifications)) = pending else {
            return false;
        };
        debug!(
            target: "ariabridge.watcher",
            %token,
            count = notifications.len(),
            "Replaying notifications received before gid was known"
        );
        for notification in &notifications {
            self.deliver(token, &watch, notification).await;
        }
        true
    }

    fn deliver_method(
        &self,
        token: SubscriptionToken,
        callback: &MethodCallback,
        notification: &Notification,
    ) {
        if !self.is_subscribed(token) {
            return;
        }
        let handling = callback(&notification.gid);
        if handling == Handling::Handled
            && notification.stage().is_terminal()
            && self.inner.unsubscribe(token)
        {
            debug!(
                target: "ariabridge.watcher",
                %token,
                gid = %notification.gid,
                "Method subscription retired"
            );
        }
    }

    async fn snapshot(&self, watch: &DownloadWatch, notification: &Notification) -> DownloadStatus {
        let gid = &notification.gid;
        let snapshot = match watch.builder.build(gid).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    target: "ariabridge.watcher",
                    %gid,
                    error = %e,
                    "Status poll failed, delivering placeholder snapshot"
                );
                DownloadStatus::placeholder(gid.clone(), notification.stage())
            }
        };

        let Some(enrichment) = &watch.enrichment else {
            return snapshot;
        };
        match enrichment.enrich(&snapshot).await {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!(
                    target: "ariabridge.watcher",
                    %gid,
                    error = %e,
                    "Snapshot enrichment failed, delivering unenriched snapshot"
                );
                snapshot
            }
        }
    }

    async fn deliver(&self, token: SubscriptionToken, watch: &DownloadWatch, notification: &Notification) {
        let stage = notification.stage();
        let snapshot = self.snapshot(watch, notification).await;
        let args = DownloadEventArgs::new(watch.locator.clone(), snapshot);

        if stage.is_terminal() {
            if !self.inner.unsubscribe(token) {
                trace!(target: "ariabridge.watcher", %token, "Already retired, skipping terminal delivery");
                return;
            }
            self.inner
                .history
                .remove_if(&watch.locator, &notification.gid);
            debug!(
                target: "ariabridge.watcher",
                %token,
                locator = %watch.locator,
                gid = %notification.gid,
                %stage,
                "Download subscription retired"
            );
        } else {
            let live = self.registry().advance(token, stage);
            if !live {
                return;
            }
        }

        watch.handlers.invoke(stage, &args);
    }
}

/// Owner of one registration.
///
/// Dropping the handle unsubscribes. [`detach`](Self::detach) leaves the
/// subscription registered until it retires itself or is removed by token.
#[must_use = "dropping the handle unsubscribes immediately"]
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: SubscriptionToken,
    watcher: Weak<WatcherInner>,
    armed: bool,
}

impl SubscriptionHandle {
    /// Token for this registration.
    pub const fn token(&self) -> SubscriptionToken {
        self.token
    }

    /// Unsubscribe now.
    pub fn release(mut self) {
        self.disarm_and_remove();
    }

    /// Keep the subscription registered after the handle is dropped.
    pub fn detach(mut self) -> SubscriptionToken {
        self.armed = false;
        self.token
    }

    fn disarm_and_remove(&mut self) {
        if !std::mem::replace(&mut self.armed, false) {
            return;
        }
        if let Some(inner) = self.watcher.upgrade() {
            inner.unsubscribe(self.token);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.disarm_and_remove();
    }
}

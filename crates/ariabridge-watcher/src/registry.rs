//! Subscription registry state.
//!
//! Pure bookkeeping with no I/O and no locking. The watcher owns one instance
//! behind a mutex and never holds that mutex across an await.

use std::collections::VecDeque;
use std::sync::Arc;

use ariabridge_core::{Gid, LifecycleStage, Notification, NotificationMethod};
use indexmap::IndexMap;

use crate::subscription::{DownloadWatch, MethodCallback, SubscriptionToken};

/// Most notifications buffered for one subscription whose gid is unknown.
pub const PENDING_CAPACITY: usize = 32;

/// Where a download-keyed subscription believes its download is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadPhase {
    /// Registered, no start notification seen yet.
    Pending,
    /// Started or resumed.
    Running,
    /// Paused, waiting for a restart.
    Paused,
}

struct DownloadEntry {
    watch: Arc<DownloadWatch>,
    phase: DownloadPhase,
    /// Notifications that arrived before the gid was known, oldest first.
    pending: VecDeque<Notification>,
}

impl DownloadEntry {
    /// Buffer a notification. When full, the oldest non-terminal one makes
    /// room, so a terminal is only evicted by a buffer full of terminals.
    fn buffer(&mut self, notification: &Notification) {
        if self.pending.len() >= PENDING_CAPACITY {
            let evict = self
                .pending
                .iter()
                .position(|n| !n.stage().is_terminal())
                .unwrap_or(0);
            self.pending.remove(evict);
        }
        self.pending.push_back(notification.clone());
    }

    /// Empty the buffer, keeping what belongs to `gid` in arrival order.
    fn drain_for(&mut self, gid: &Gid) -> Vec<Notification> {
        self.pending.drain(..).filter(|n| n.gid == *gid).collect()
    }
}

struct MethodEntry {
    method: NotificationMethod,
    callback: MethodCallback,
}

enum Entry {
    Download(DownloadEntry),
    Method(MethodEntry),
}

/// A subscription selected for one notification.
pub(crate) enum Match {
    Download {
        token: SubscriptionToken,
        watch: Arc<DownloadWatch>,
        notification: Notification,
    },
    Method {
        token: SubscriptionToken,
        callback: MethodCallback,
    },
}

/// Token → subscription, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    entries: IndexMap<SubscriptionToken, Entry>,
}

impl Registry {
    pub(crate) fn insert_download(&mut self, token: SubscriptionToken, watch: DownloadWatch) {
        self.entries.insert(
            token,
            Entry::Download(DownloadEntry {
                watch: Arc::new(watch),
                phase: DownloadPhase::Pending,
                pending: VecDeque::new(),
            }),
        );
    }

    pub(crate) fn insert_method(
        &mut self,
        token: SubscriptionToken,
        method: NotificationMethod,
        callback: MethodCallback,
    ) {
        self.entries
            .insert(token, Entry::Method(MethodEntry { method, callback }));
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub(crate) fn remove(&mut self, token: SubscriptionToken) -> bool {
        self.entries.shift_remove(&token).is_some()
    }

    pub(crate) fn contains(&self, token: SubscriptionToken) -> bool {
        self.entries.contains_key(&token)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Select every subscription interested in `notification`, in
    /// registration order.
    ///
    /// Download-keyed subscriptions whose gid is still unresolved buffer the
    /// notification, up to [`PENDING_CAPACITY`]. A resolved subscription that
    /// still holds a buffer is matched with its own buffered notifications
    /// first, so it sees them in arrival order ahead of this one. Buffered
    /// notifications for other gids are dropped at that point.
    pub(crate) fn matches(&mut self, notification: &Notification) -> Vec<Match> {
        let mut matched = Vec::new();
        for (token, entry) in &mut self.entries {
            match entry {
                Entry::Method(method) => {
                    if method.method == notification.method {
                        matched.push(Match::Method {
                            token: *token,
                            callback: Arc::clone(&method.callback),
                        });
                    }
                }
                Entry::Download(download) => {
                    let Some(gid) = download.watch.gid() else {
                        download.buffer(notification);
                        continue;
                    };
                    for earlier in download.drain_for(&gid) {
                        matched.push(Match::Download {
                            token: *token,
                            watch: Arc::clone(&download.watch),
                            notification: earlier,
                        });
                    }
                    if gid == notification.gid {
                        matched.push(Match::Download {
                            token: *token,
                            watch: Arc::clone(&download.watch),
                            notification: notification.clone(),
                        });
                    }
                }
            }
        }
        matched
    }

    /// Take the buffered notifications that belong to the now-resolved gid,
    /// oldest first.
    ///
    /// Once the gid is known the buffer is cleared either way; notifications
    /// for some other download were never ours.
    pub(crate) fn take_pending(
        &mut self,
        token: SubscriptionToken,
    ) -> Option<(Arc<DownloadWatch>, Vec<Notification>)> {
        let Some(Entry::Download(download)) = self.entries.get_mut(&token) else {
            return None;
        };
        let gid = download.watch.gid()?;
        let pending = download.drain_for(&gid);
        (!pending.is_empty()).then(|| (Arc::clone(&download.watch), pending))
    }

    /// Record the phase implied by a non-terminal stage.
    ///
    /// Returns false if the subscription is gone.
    pub(crate) fn advance(&mut self, token: SubscriptionToken, stage: LifecycleStage) -> bool {
        match self.entries.get_mut(&token) {
            Some(Entry::Download(download)) => {
                match stage {
                    LifecycleStage::Started | LifecycleStage::Progress => {
                        download.phase = DownloadPhase::Running;
                    }
                    LifecycleStage::Paused => download.phase = DownloadPhase::Paused,
                    LifecycleStage::Completed | LifecycleStage::Error | LifecycleStage::Stopped => {}
                }
                true
            }
            Some(Entry::Method(_)) => true,
            None => false,
        }
    }

    pub(crate) fn phase(&self, token: SubscriptionToken) -> Option<DownloadPhase> {
        match self.entries.get(&token) {
            Some(Entry::Download(download)) => Some(download.phase),
            _ => None,
        }
    }

    /// Gids of downloads currently running, deduplicated, in registration
    /// order.
    pub(crate) fn running_gids(&self) -> Vec<Gid> {
        let mut gids: Vec<Gid> = Vec::new();
        for entry in self.entries.values() {
            if let Entry::Download(download) = entry {
                if download.phase != DownloadPhase::Running {
                    continue;
                }
                if let Some(gid) = download.watch.gid() {
                    if !gids.contains(&gid) {
                        gids.push(gid);
                    }
                }
            }
        }
        gids
    }
}

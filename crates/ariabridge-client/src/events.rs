//! Public event surface.
//!
//! Six event streams, one per lifecycle stage, each carrying the download's
//! locator and snapshot. Listeners are explicit records keyed by a token;
//! async consumers can also take a broadcast receiver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ariabridge_core::{DownloadEventArgs, LifecycleStage};
use indexmap::IndexMap;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast channel capacity for download events.
const CHANNEL_CAPACITY: usize = 64;

/// Listener callback.
pub type Listener = Arc<dyn Fn(&DownloadEventArgs) + Send + Sync>;

/// Key returned by [`EventHub::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// One emitted event, as seen by broadcast subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadEvent {
    pub stage: LifecycleStage,
    pub args: DownloadEventArgs,
}

/// Listener registry per lifecycle stage.
pub struct EventHub {
    listeners: Mutex<IndexMap<ListenerToken, (LifecycleStage, Listener)>>,
    next_token: AtomicU64,
    sender: broadcast::Sender<DownloadEvent>,
}

impl EventHub {
    /// Empty hub with a broadcast channel of `CHANNEL_CAPACITY` events.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            listeners: Mutex::new(IndexMap::new()),
            next_token: AtomicU64::new(1),
            sender,
        }
    }

    fn listeners(&self) -> MutexGuard<'_, IndexMap<ListenerToken, (LifecycleStage, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `listener` for `stage`.
    pub fn add_listener<F>(&self, stage: LifecycleStage, listener: F) -> ListenerToken
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        let token = ListenerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.listeners().insert(token, (stage, Arc::new(listener)));
        token
    }

    /// Remove a listener. Unknown tokens are a no-op.
    pub fn remove_listener(&self, token: ListenerToken) -> bool {
        self.listeners().shift_remove(&token).is_some()
    }

    /// Number of listeners registered for `stage`.
    pub fn listener_count(&self, stage: LifecycleStage) -> usize {
        self.listeners()
            .values()
            .filter(|(registered, _)| *registered == stage)
            .count()
    }

    /// Receive every emitted event.
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.sender.subscribe()
    }

    /// Invoke every listener for `stage`, in registration order. Returns how
    /// many ran.
    ///
    /// Listeners run outside the registry lock, so they may add or remove
    /// listeners themselves.
    pub fn emit(&self, stage: LifecycleStage, args: &DownloadEventArgs) -> usize {
        let selected: Vec<Listener> = self
            .listeners()
            .values()
            .filter(|(registered, _)| *registered == stage)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &selected {
            listener(args);
        }

        if self.sender.receiver_count() > 0 {
            trace!(target: "ariabridge.client", %stage, gid = %args.gid(), "Broadcasting download event");
            let _ = self.sender.send(DownloadEvent {
                stage,
                args: args.clone(),
            });
        }

        selected.len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners().len())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

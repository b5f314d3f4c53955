//! Subscription descriptors: what a caller registers with the watcher.

use std::fmt;
use std::sync::{Arc, OnceLock};

use ariabridge_core::{DownloadEventArgs, Enrichment, Gid, LifecycleStage, SnapshotBuilder};

/// Callback invoked with the event payload for one lifecycle stage.
pub type DownloadHandler = Arc<dyn Fn(&DownloadEventArgs) + Send + Sync>;

/// Returns the gid once the submitting command has answered.
pub type GidResolver = Arc<dyn Fn() -> Option<Gid> + Send + Sync>;

/// Callback for a name-keyed subscription.
pub type MethodCallback = Arc<dyn Fn(&Gid) -> Handling + Send + Sync>;

/// Opaque key identifying one registered subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value, for logs.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An ordered group of tokens removed together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    tokens: Vec<SubscriptionToken>,
}

impl SubscriptionSet {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Add a token.
    pub fn push(&mut self, token: SubscriptionToken) {
        self.tokens.push(token);
    }

    /// Iterate tokens in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, SubscriptionToken> {
        self.tokens.iter()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the set holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<SubscriptionToken> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = SubscriptionToken>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SubscriptionSet {
    type Item = &'a SubscriptionToken;
    type IntoIter = std::slice::Iter<'a, SubscriptionToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// What a name-keyed callback did with a notification.
///
/// Name-keyed subscriptions see every download's notifications. Only one
/// that returns `Handled` for a terminal method is retired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handling {
    /// The notification was not for this subscriber.
    Ignored,
    /// The subscriber acted on the notification.
    Handled,
}

/// Up to six per-stage callbacks. Absent slots are skipped.
#[derive(Clone, Default)]
pub struct DownloadHandlers {
    started: Option<DownloadHandler>,
    progress: Option<DownloadHandler>,
    paused: Option<DownloadHandler>,
    completed: Option<DownloadHandler>,
    error: Option<DownloadHandler>,
    stopped: Option<DownloadHandler>,
}

impl DownloadHandlers {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback for `stage`, replacing any previous one.
    #[must_use]
    pub fn on<F>(mut self, stage: LifecycleStage, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        *self.slot_mut(stage) = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn on_started<F>(self, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        self.on(LifecycleStage::Started, handler)
    }

    #[must_use]
    pub fn on_progress<F>(self, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        self.on(LifecycleStage::Progress, handler)
    }

    #[must_use]
    pub fn on_paused<F>(self, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        self.on(LifecycleStage::Paused, handler)
    }

    #[must_use]
    pub fn on_completed<F>(self, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        self.on(LifecycleStage::Completed, handler)
    }

    #[must_use]
    pub fn on_error<F>(self, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        self.on(LifecycleStage::Error, handler)
    }

    #[must_use]
    pub fn on_stopped<F>(self, handler: F) -> Self
    where
        F: Fn(&DownloadEventArgs) + Send + Sync + 'static,
    {
        self.on(LifecycleStage::Stopped, handler)
    }

    const fn slot(&self, stage: LifecycleStage) -> Option<&DownloadHandler> {
        match stage {
            LifecycleStage::Started => self.started.as_ref(),
            LifecycleStage::Progress => self.progress.as_ref(),
            LifecycleStage::Paused => self.paused.as_ref(),
            LifecycleStage::Completed => self.completed.as_ref(),
            LifecycleStage::Error => self.error.as_ref(),
            LifecycleStage::Stopped => self.stopped.as_ref(),
        }
    }

    fn slot_mut(&mut self, stage: LifecycleStage) -> &mut Option<DownloadHandler> {
        match stage {
            LifecycleStage::Started => &mut self.started,
            LifecycleStage::Progress => &mut self.progress,
            LifecycleStage::Paused => &mut self.paused,
            LifecycleStage::Completed => &mut self.completed,
            LifecycleStage::Error => &mut self.error,
            LifecycleStage::Stopped => &mut self.stopped,
        }
    }

    /// Whether a callback is set for `stage`.
    #[must_use]
    pub const fn has(&self, stage: LifecycleStage) -> bool {
        self.slot(stage).is_some()
    }

    /// Invoke the callback for `stage`. Returns false if the slot is empty.
    pub fn invoke(&self, stage: LifecycleStage, args: &DownloadEventArgs) -> bool {
        match self.slot(stage) {
            Some(handler) => {
                handler(args);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for DownloadHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = LifecycleStage::ALL
            .into_iter()
            .filter(|stage| self.has(*stage))
            .map(|stage| stage.as_str())
            .collect();
        f.debug_struct("DownloadHandlers").field("set", &set).finish()
    }
}

/// A download-keyed subscription.
///
/// The gid is usually unknown at registration time: the subscription must
/// exist before the command is sent, or an early notification would be lost.
/// `resolver` yields the gid once the command has answered.
pub struct DownloadWatch {
    pub(crate) locator: String,
    pub(crate) resolver: GidResolver,
    pub(crate) builder: Arc<dyn SnapshotBuilder>,
    pub(crate) enrichment: Option<Arc<dyn Enrichment>>,
    pub(crate) handlers: DownloadHandlers,
}

impl DownloadWatch {
    /// Watch the download submitted for `locator`.
    ///
    /// `resolver` runs while the registry lock is held. It must be cheap and
    /// must not call back into the watcher.
    pub fn new<R>(locator: impl Into<String>, resolver: R, builder: Arc<dyn SnapshotBuilder>) -> Self
    where
        R: Fn() -> Option<Gid> + Send + Sync + 'static,
    {
        Self {
            locator: locator.into(),
            resolver: Arc::new(resolver),
            builder,
            enrichment: None,
            handlers: DownloadHandlers::default(),
        }
    }

    /// Transform every snapshot before delivery.
    #[must_use]
    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Install the per-stage callbacks.
    #[must_use]
    pub fn with_handlers(mut self, handlers: DownloadHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Locator this subscription reports.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Current gid, if resolved.
    pub fn gid(&self) -> Option<Gid> {
        (self.resolver)()
    }
}

impl fmt::Debug for DownloadWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadWatch")
            .field("locator", &self.locator)
            .field("gid", &self.gid())
            .field("enriched", &self.enrichment.is_some())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

/// Write-once gid slot shared between a submitter and its subscription.
#[derive(Clone, Debug, Default)]
pub struct GidCell(Arc<OnceLock<Gid>>);

impl GidCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the cell. Returns false if it already held a gid.
    pub fn set(&self, gid: Gid) -> bool {
        self.0.set(gid).is_ok()
    }

    /// The gid, once set.
    pub fn get(&self) -> Option<Gid> {
        self.0.get().cloned()
    }

    /// A resolver reading this cell, for [`DownloadWatch::new`].
    pub fn resolver(&self) -> impl Fn() -> Option<Gid> + Send + Sync + 'static {
        let cell = self.clone();
        move || cell.get()
    }
}

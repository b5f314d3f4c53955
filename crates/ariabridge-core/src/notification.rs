//! Push notifications and the lifecycle stages they map to.

use serde::{Deserialize, Serialize};

use crate::gid::Gid;

/// Method name carried by a push notification.
///
/// The first six are emitted by the engine. `ProgressPoll` is synthetic: the
/// progress ticker injects it on the same delivery path so progress polls are
/// ordered with real notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationMethod {
    /// `aria2.onDownloadStart`
    DownloadStart,
    /// `aria2.onDownloadPause`
    DownloadPause,
    /// `aria2.onDownloadStop`
    DownloadStop,
    /// `aria2.onDownloadComplete`
    DownloadComplete,
    /// `aria2.onDownloadError`
    DownloadError,
    /// `aria2.onBtDownloadComplete`
    BtDownloadComplete,
    /// `ariabridge.onDownloadProgress`
    ProgressPoll,
}

impl NotificationMethod {
    /// All methods, engine-emitted first.
    pub const ALL: [Self; 7] = [
        Self::DownloadStart,
        Self::DownloadPause,
        Self::DownloadStop,
        Self::DownloadComplete,
        Self::DownloadError,
        Self::BtDownloadComplete,
        Self::ProgressPoll,
    ];

    /// Wire name of the method.
    #[must_use]
    pub const fn as_wire(&self) -> &'static str {
        match self {
            Self::DownloadStart => "aria2.onDownloadStart",
            Self::DownloadPause => "aria2.onDownloadPause",
            Self::DownloadStop => "aria2.onDownloadStop",
            Self::DownloadComplete => "aria2.onDownloadComplete",
            Self::DownloadError => "aria2.onDownloadError",
            Self::BtDownloadComplete => "aria2.onBtDownloadComplete",
            Self::ProgressPoll => "ariabridge.onDownloadProgress",
        }
    }

    /// Parse a wire name. Unknown names return `None`.
    #[must_use]
    pub fn parse(wire: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_wire() == wire)
    }

    /// Lifecycle stage this method classifies into.
    #[must_use]
    pub const fn stage(&self) -> LifecycleStage {
        match self {
            Self::DownloadStart => LifecycleStage::Started,
            Self::ProgressPoll => LifecycleStage::Progress,
            Self::DownloadPause => LifecycleStage::Paused,
            Self::DownloadComplete | Self::BtDownloadComplete => LifecycleStage::Completed,
            Self::DownloadError => LifecycleStage::Error,
            Self::DownloadStop => LifecycleStage::Stopped,
        }
    }
}

impl std::fmt::Display for NotificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Lifecycle stage of a download, one per callback slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// The download started (or restarted after a pause).
    Started,
    /// Periodic progress update.
    Progress,
    /// The download was paused. Not terminal.
    Paused,
    /// The download finished.
    Completed,
    /// The download failed.
    Error,
    /// The download was stopped and removed.
    Stopped,
}

impl LifecycleStage {
    /// All stages in callback-slot order.
    pub const ALL: [Self; 6] = [
        Self::Started,
        Self::Progress,
        Self::Paused,
        Self::Completed,
        Self::Error,
        Self::Stopped,
    ];

    /// Completed, error and stopped retire the subscription.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }

    /// Stable name for logs and wire protocols.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Progress => "progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One push notification: `(method name, download identifier)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Notification {
    /// Method name.
    pub method: NotificationMethod,
    /// Download the notification refers to.
    pub gid: Gid,
}

impl Notification {
    /// Create a notification.
    pub fn new(method: NotificationMethod, gid: impl Into<Gid>) -> Self {
        Self {
            method,
            gid: gid.into(),
        }
    }

    /// Stage this notification classifies into.
    #[must_use]
    pub const fn stage(&self) -> LifecycleStage {
        self.method.stage()
    }
}

//! Payload delivered to public event listeners.

use serde::{Deserialize, Serialize};

use crate::gid::Gid;
use crate::status::DownloadStatus;

/// Event payload for every lifecycle stage: where the download came from and
/// what the engine reported about it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEventArgs {
    /// Caller-supplied locator (source URL or file path).
    pub locator: String,
    /// Snapshot taken for this event.
    pub status: DownloadStatus,
}

impl DownloadEventArgs {
    /// Create event args.
    pub fn new(locator: impl Into<String>, status: DownloadStatus) -> Self {
        Self {
            locator: locator.into(),
            status,
        }
    }

    /// Gid of the snapshot.
    #[must_use]
    pub const fn gid(&self) -> &Gid {
        &self.status.gid
    }
}

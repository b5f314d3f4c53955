//! Snapshot pipeline ports used by identifier-keyed subscriptions.

use async_trait::async_trait;

use crate::errors::ClientResult;
use crate::gid::Gid;
use crate::status::DownloadStatus;

/// Builds the status snapshot delivered with a notification.
///
/// Typically a full status poll by gid.
#[async_trait]
pub trait SnapshotBuilder: Send + Sync {
    /// Build a snapshot for `gid`.
    async fn build(&self, gid: &Gid) -> ClientResult<DownloadStatus>;
}

/// Augments a snapshot with fields the builder did not supply.
///
/// The canonical use merges a cheaper progress-only poll (live speed and
/// lengths) into the full snapshot. Implementations return a new snapshot;
/// the input is never modified.
#[async_trait]
pub trait Enrichment: Send + Sync {
    /// Produce an enriched copy of `snapshot`.
    async fn enrich(&self, snapshot: &DownloadStatus) -> ClientResult<DownloadStatus>;
}

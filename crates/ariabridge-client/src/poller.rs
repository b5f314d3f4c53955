//! Status polling and the snapshot pipeline built on it.

use std::sync::Arc;

use ariabridge_core::{
    ClientError, ClientResult, CommandChannel, DownloadStatus, Enrichment, Gid, RpcMethod,
    SnapshotBuilder,
};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Fields requested by the progress-only poll.
pub const PROGRESS_FIELDS: [&str; 4] = ["status", "completedLength", "totalLength", "downloadSpeed"];

/// Queries download status over the command channel.
#[derive(Clone)]
pub struct StatusPoller {
    channel: Arc<dyn CommandChannel>,
}

impl StatusPoller {
    /// Poller issuing `tellStatus` over `channel`.
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self { channel }
    }

    /// Full status of `gid`.
    pub async fn status(&self, gid: &Gid) -> ClientResult<DownloadStatus> {
        let value = self
            .channel
            .call(RpcMethod::TellStatus, vec![json!(gid)])
            .await?;
        decode_status(value, gid)
    }

    /// Progress-only status of `gid`: status tag, lengths and speed.
    pub async fn progress(&self, gid: &Gid) -> ClientResult<DownloadStatus> {
        let value = self
            .channel
            .call(RpcMethod::TellStatus, vec![json!(gid), json!(PROGRESS_FIELDS)])
            .await?;
        decode_status(value, gid)
    }
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller").finish_non_exhaustive()
    }
}

// Filtered polls omit the gid, so fill it in from the request.
fn decode_status(value: Value, gid: &Gid) -> ClientResult<DownloadStatus> {
    let mut status: DownloadStatus = serde_json::from_value(value)
        .map_err(|e| ClientError::invalid_response(format!("bad tellStatus reply: {e}")))?;
    if status.gid.is_empty() {
        status.gid = gid.clone();
    }
    Ok(status)
}

/// Builds snapshots with a full status poll.
#[derive(Debug, Clone)]
pub struct FullStatusBuilder {
    poller: StatusPoller,
}

impl FullStatusBuilder {
    pub const fn new(poller: StatusPoller) -> Self {
        Self { poller }
    }
}

#[async_trait]
impl SnapshotBuilder for FullStatusBuilder {
    async fn build(&self, gid: &Gid) -> ClientResult<DownloadStatus> {
        self.poller.status(gid).await
    }
}

/// Refreshes the live fields of a snapshot with a progress-only poll.
#[derive(Debug, Clone)]
pub struct ProgressEnrichment {
    poller: StatusPoller,
}

impl ProgressEnrichment {
    pub const fn new(poller: StatusPoller) -> Self {
        Self { poller }
    }
}

#[async_trait]
impl Enrichment for ProgressEnrichment {
    async fn enrich(&self, snapshot: &DownloadStatus) -> ClientResult<DownloadStatus> {
        let progress = self.poller.progress(&snapshot.gid).await?;
        Ok(snapshot.merge_progress(&progress))
    }
}

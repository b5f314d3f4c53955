//! Download status snapshots.
//!
//! The engine encodes every number and boolean in `tellStatus` responses as a
//! decimal string (`"completedLength": "34896138"`, `"selected": "true"`).
//! The deserializers in [`wire`] accept both the string form and plain JSON
//! values so snapshots can also round-trip through our own serialization.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gid::Gid;
use crate::notification::LifecycleStage;

/// Status tag reported by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    /// Queued, not yet started.
    #[default]
    Waiting,
    /// Currently downloading or seeding.
    Active,
    /// Paused by a command.
    Paused,
    /// Stopped because of an error.
    Error,
    /// Finished successfully.
    Complete,
    /// Removed by a command.
    Removed,
}

impl StatusTag {
    /// Wire representation of the tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Complete => "complete",
            Self::Removed => "removed",
        }
    }

    /// Whether the engine will never change this download again.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Error | Self::Complete | Self::Removed)
    }
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source URI of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUri {
    /// The URI.
    pub uri: String,
    /// `used` or `waiting`.
    pub status: String,
}

/// Per-file record of a download.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFile {
    /// 1-based file index.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub index: u64,
    /// Local path of the file.
    #[serde(default)]
    pub path: String,
    /// File size in bytes.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub length: u64,
    /// Bytes completed for this file.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub completed_length: u64,
    /// Whether the file is selected for download.
    #[serde(default, deserialize_with = "wire::bool_from_str")]
    pub selected: bool,
    /// Source URIs.
    #[serde(default)]
    pub uris: Vec<FileUri>,
}

/// Immutable snapshot of a download's state.
///
/// Every poll produces a new snapshot. Field-filtered polls (see
/// [`merge_progress`](Self::merge_progress)) only carry a subset of fields;
/// missing fields take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStatus {
    /// Identifier of the download.
    #[serde(default)]
    pub gid: Gid,
    /// Status tag.
    #[serde(default)]
    pub status: StatusTag,
    /// Total length in bytes (0 while unknown).
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub total_length: u64,
    /// Completed length in bytes.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub completed_length: u64,
    /// Download speed in bytes per second.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub download_speed: u64,
    /// Upload speed in bytes per second.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub upload_speed: u64,
    /// Number of peers/servers connected.
    #[serde(default, deserialize_with = "wire::u64_from_str")]
    pub connections: u64,
    /// Destination directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Engine error code (only meaningful when `status` is `error`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Engine error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Files in download order.
    #[serde(default)]
    pub files: Vec<DownloadFile>,
}

impl DownloadStatus {
    /// Minimal snapshot used when the real status poll failed.
    ///
    /// The tag is inferred from the lifecycle stage being delivered.
    pub fn placeholder(gid: Gid, stage: LifecycleStage) -> Self {
        let status = match stage {
            LifecycleStage::Started | LifecycleStage::Progress => StatusTag::Active,
            LifecycleStage::Paused => StatusTag::Paused,
            LifecycleStage::Completed => StatusTag::Complete,
            LifecycleStage::Error => StatusTag::Error,
            LifecycleStage::Stopped => StatusTag::Removed,
        };
        Self {
            gid,
            status,
            ..Self::default()
        }
    }

    /// Bytes still to download.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.total_length.saturating_sub(self.completed_length)
    }

    /// Progress percentage (0.0 - 100.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.total_length == 0 {
            return 0.0;
        }
        (self.completed_length as f64 / self.total_length as f64) * 100.0
    }

    /// Estimated time remaining, `None` while the speed is zero.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        if self.download_speed == 0 {
            return None;
        }
        Some(Duration::from_secs(
            self.remaining().div_ceil(self.download_speed),
        ))
    }

    /// Error code, only when the download is in the error state.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        if self.status == StatusTag::Error {
            self.error_code.as_deref()
        } else {
            None
        }
    }

    /// Path of the first file, if the engine reported one.
    #[must_use]
    pub fn primary_path(&self) -> Option<&str> {
        self.files
            .first()
            .map(|file| file.path.as_str())
            .filter(|path| !path.is_empty())
    }

    /// Produce a new snapshot with the live fields of a progress-only poll.
    ///
    /// Status, completed/total length and download speed come from
    /// `progress`; everything else is kept.
    #[must_use]
    pub fn merge_progress(&self, progress: &Self) -> Self {
        Self {
            status: progress.status,
            completed_length: progress.completed_length,
            total_length: progress.total_length,
            download_speed: progress.download_speed,
            ..self.clone()
        }
    }
}

/// Deserializers for the engine's string-encoded scalars.
pub mod wire {
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(u64),
        Flag(bool),
    }

    /// Accept `"123"` or `123`.
    pub fn u64_from_str<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Scalar::deserialize(deserializer)? {
            Scalar::Text(text) if text.is_empty() => Ok(0),
            Scalar::Text(text) => text.parse().map_err(de::Error::custom),
            Scalar::Number(n) => Ok(n),
            Scalar::Flag(_) => Err(de::Error::custom("expected a number, found a boolean")),
        }
    }

    /// Accept `"true"`/`"false"` or a JSON boolean.
    pub fn bool_from_str<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Scalar::deserialize(deserializer)? {
            Scalar::Text(text) => match text.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(de::Error::custom(format!("invalid boolean '{other}'"))),
            },
            Scalar::Flag(flag) => Ok(flag),
            Scalar::Number(_) => Err(de::Error::custom("expected a boolean, found a number")),
        }
    }
}

//! Engine command methods.

/// Methods the client issues over the command channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    /// Add a download by URI list.
    AddUri,
    /// Add a download from base64 torrent bytes.
    AddTorrent,
    /// Query status (full or field-filtered).
    TellStatus,
    /// Pause without waiting for peers.
    ForcePause,
    /// Resume a paused download.
    Unpause,
    /// Stop and remove without waiting for peers.
    ForceRemove,
    /// Drop the result record of a finished download.
    RemoveDownloadResult,
    /// Drop every completed/error/removed result record.
    PurgeDownloadResult,
    /// Shut the engine down immediately.
    ForceShutdown,
    /// Change global options such as the destination directory.
    ChangeGlobalOption,
    /// Engine version and enabled features.
    GetVersion,
}

impl RpcMethod {
    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AddUri => "aria2.addUri",
            Self::AddTorrent => "aria2.addTorrent",
            Self::TellStatus => "aria2.tellStatus",
            Self::ForcePause => "aria2.forcePause",
            Self::Unpause => "aria2.unpause",
            Self::ForceRemove => "aria2.forceRemove",
            Self::RemoveDownloadResult => "aria2.removeDownloadResult",
            Self::PurgeDownloadResult => "aria2.purgeDownloadResult",
            Self::ForceShutdown => "aria2.forceShutdown",
            Self::ChangeGlobalOption => "aria2.changeGlobalOption",
            Self::GetVersion => "aria2.getVersion",
        }
    }
}

impl std::fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! CLI-specific error types and mappings.
//!
//! Maps client and engine process errors to exit codes and user-facing
//! messages.

use ariabridge_core::{ClientError, Gid};
use ariabridge_runtime::EngineProcessError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The engine or the connection to it failed.
    #[error("{}", .0.user_message())]
    Client(ClientError),

    /// Argument error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine process error.
    #[error("Process error: {0}")]
    Process(String),

    /// A waited-on download ended in error.
    #[error("Download {gid} failed: {message}")]
    DownloadFailed { gid: Gid, message: String },
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// Follows sysexits.h where a category fits.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Client(err) => match err {
                ClientError::Transport { .. } => 69,       // EX_UNAVAILABLE
                ClientError::InvalidResponse { .. } => 76, // EX_PROTOCOL
                ClientError::DuplicateLocator { .. } => 75, // EX_TEMPFAIL
                ClientError::Io { .. } => 74,              // EX_IOERR
                ClientError::MissingFile { .. } => 66,     // EX_NOINPUT
                ClientError::Engine { .. } => 1,
            },
            Self::Arguments(_) => 2,
            Self::Io(_) => 74,
            Self::Config(_) => 78,
            Self::Process(_) => 71,
            Self::DownloadFailed { .. } => 1,
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

impl From<EngineProcessError> for CliError {
    fn from(err: EngineProcessError) -> Self {
        match err {
            EngineProcessError::NotFound(_) | EngineProcessError::Config(_) => {
                Self::Config(err.to_string())
            }
            EngineProcessError::Io(e) => Self::Io(e.to_string()),
            other => Self::Process(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

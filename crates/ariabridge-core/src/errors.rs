//! Client error types.
//!
//! These errors are serializable and do not hold external error types like
//! `std::io::Error` or `reqwest::Error`. Adapters capture the kind and
//! message as strings at the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gid::Gid;

/// Error type for every client, watcher and transport operation.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientError {
    /// The engine answered with an error envelope.
    #[error("Engine error {code}: {message}")]
    Engine {
        /// Engine error code.
        code: i64,
        /// Engine error message.
        message: String,
    },

    /// The command could not be delivered or the reply never arrived.
    #[error("Transport error: {message}")]
    Transport {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// The engine replied with something we could not decode.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// A submission for this locator is still in flight.
    #[error("Duplicate locator: {locator} is already being downloaded")]
    DuplicateLocator {
        /// The locator that was resubmitted.
        locator: String,
    },

    /// I/O error while reading a local file.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// A finished download reported no file to continue with.
    #[error("Download {gid} reported no files")]
    MissingFile {
        /// The download that had no files.
        gid: Gid,
    },
}

impl ClientError {
    /// Create an engine error.
    pub fn engine(code: i64, message: impl Into<String>) -> Self {
        Self::Engine {
            code,
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a transport error with HTTP status code.
    pub fn transport_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a duplicate locator error.
    pub fn duplicate_locator(locator: impl Into<String>) -> Self {
        Self::DuplicateLocator {
            locator: locator.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Whether the engine itself rejected the command.
    #[must_use]
    pub const fn is_engine(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }

    /// Whether the error is a duplicate submission.
    #[must_use]
    pub const fn is_duplicate_locator(&self) -> bool {
        matches!(self, Self::DuplicateLocator { .. })
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Engine { code, message } => format!("aria2 rejected the command ({code}): {message}"),
            Self::Transport {
                message,
                status_code: Some(code),
            } => format!("Could not reach aria2 (HTTP {code}): {message}"),
            Self::Transport { message, .. } => format!("Could not reach aria2: {message}"),
            Self::InvalidResponse { message } => format!("aria2 sent an unexpected reply: {message}"),
            Self::DuplicateLocator { locator } => {
                format!("'{locator}' is already downloading. Wait for it to finish.")
            }
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::MissingFile { gid } => format!("Download {gid} finished without a file."),
        }
    }
}

/// Convenience result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

//! Engine process errors.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ariabridge_core::ConfigError;
use thiserror::Error;

/// Errors raised while locating, launching or supervising the engine.
#[derive(Debug, Error)]
pub enum EngineProcessError {
    #[error("Engine executable not found: {0}")]
    NotFound(String),

    #[error("Invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn {}: {source}", .executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Engine exited unexpectedly (code: {})", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Exited { code: Option<i32> },

    #[error("RPC port {port} not reachable after {waited:?}")]
    RpcTimeout { port: u16, waited: Duration },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EngineProcessError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    pub fn spawn(executable: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Spawn {
            executable: executable.into(),
            source,
        }
    }
}

/// Result alias for engine process operations.
pub type EngineResult<T> = Result<T, EngineProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_message_without_code() {
        let err = EngineProcessError::Exited { code: None };
        assert_eq!(err.to_string(), "Engine exited unexpectedly (code: signal)");

        let err = EngineProcessError::Exited { code: Some(28) };
        assert_eq!(err.to_string(), "Engine exited unexpectedly (code: 28)");
    }

    #[test]
    fn test_config_error_converts() {
        let err: EngineProcessError = ConfigError::InvalidConcurrency.into();
        assert!(matches!(err, EngineProcessError::Config(_)));
    }
}

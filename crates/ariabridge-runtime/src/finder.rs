//! Locating the engine executable.

use std::path::PathBuf;

use ariabridge_core::EngineConfig;
use tracing::debug;

use crate::error::{EngineProcessError, EngineResult};

/// Executable name looked up on `PATH`.
pub const ENGINE_BINARY: &str = "aria2c";

/// Resolve the engine executable.
///
/// An explicitly configured path wins and must point at a file; otherwise
/// `aria2c` is looked up on `PATH`.
pub fn locate_engine(config: &EngineConfig) -> EngineResult<PathBuf> {
    if let Some(path) = &config.executable {
        if path.is_file() {
            debug!(target: "ariabridge.runtime", path = %path.display(), "Using configured engine");
            return Ok(path.clone());
        }
        return Err(EngineProcessError::not_found(format!(
            "configured path {} is not a file",
            path.display()
        )));
    }

    let path = which::which(ENGINE_BINARY)
        .map_err(|e| EngineProcessError::not_found(format!("{ENGINE_BINARY} on PATH: {e}")))?;
    debug!(target: "ariabridge.runtime", path = %path.display(), "Found engine on PATH");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_file_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = EngineConfig::new().with_executable(file.path());
        assert_eq!(locate_engine(&config).unwrap(), file.path());
    }

    #[test]
    fn test_configured_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::new().with_executable(dir.path());
        let err = locate_engine(&config).unwrap_err();
        assert!(matches!(err, EngineProcessError::NotFound(_)));
    }

    #[test]
    fn test_missing_configured_path() {
        let config = EngineConfig::new().with_executable("/nonexistent/aria2c");
        assert!(locate_engine(&config).is_err());
    }
}

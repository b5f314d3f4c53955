//! Engine and client configuration.
//!
//! One `EngineConfig` describes both how to launch the aria2 engine and how
//! the client reaches it. Values come from defaults, `ARIABRIDGE_*`
//! environment variables, and builder overrides, in that order.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default RPC listen port of the engine.
pub const DEFAULT_RPC_PORT: u16 = 6800;

/// Default BitTorrent listen port of the engine.
pub const DEFAULT_LISTEN_PORT: u16 = 6881;

/// Configuration for the engine process and the client talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// JSON-RPC endpoint for commands.
    pub jsonrpc_url: String,
    /// JSON-RPC protocol version sent in every request.
    pub jsonrpc_version: String,
    /// Request id sent in every request.
    pub session_id: String,
    /// Push endpoint for notifications.
    pub websocket_url: String,
    /// Secret token (`--rpc-secret`), prefixed to every command's params.
    pub rpc_secret: Option<String>,
    /// Explicit path to the engine executable; `PATH` lookup otherwise.
    pub executable: Option<PathBuf>,
    /// Directory the engine downloads into.
    pub download_dir: PathBuf,
    /// BitTorrent listen port.
    pub listen_port: u16,
    /// RPC listen port.
    pub rpc_port: u16,
    /// Maximum parallel downloads.
    pub max_concurrent_downloads: u32,
    /// Overall download limit in bytes/s (0 = unlimited).
    pub max_download_limit: u64,
    /// Overall upload limit in bytes/s (0 = unlimited).
    pub max_upload_limit: u64,
    /// Interval between progress polls of running downloads.
    pub progress_interval: Duration,
    /// Timeout for a single command.
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jsonrpc_url: format!("http://localhost:{DEFAULT_RPC_PORT}/jsonrpc"),
            jsonrpc_version: "2.0".to_string(),
            session_id: "ariabridge-session".to_string(),
            websocket_url: format!("ws://localhost:{DEFAULT_RPC_PORT}/jsonrpc"),
            rpc_secret: None,
            executable: None,
            download_dir: std::env::temp_dir(),
            listen_port: DEFAULT_LISTEN_PORT,
            rpc_port: DEFAULT_RPC_PORT,
            max_concurrent_downloads: 5,
            max_download_limit: 0,
            max_upload_limit: 0,
            progress_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `ARIABRIDGE_*` environment variables on the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup on the defaults.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ARIABRIDGE_RPC_URL") {
            config.jsonrpc_url = url;
        }
        if let Some(url) = lookup("ARIABRIDGE_WS_URL") {
            config.websocket_url = url;
        }
        if let Some(secret) = lookup("ARIABRIDGE_RPC_SECRET") {
            config.rpc_secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Some(path) = lookup("ARIABRIDGE_ARIA2C") {
            config.executable = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("ARIABRIDGE_DOWNLOAD_DIR") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Some(port) = parse_var(&lookup, "ARIABRIDGE_RPC_PORT") {
            config.rpc_port = port;
        }
        if let Some(port) = parse_var(&lookup, "ARIABRIDGE_LISTEN_PORT") {
            config.listen_port = port;
        }
        if let Some(max) = parse_var(&lookup, "ARIABRIDGE_MAX_CONCURRENT") {
            config.max_concurrent_downloads = max;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ARIABRIDGE_PROGRESS_INTERVAL_MS") {
            config.progress_interval = Duration::from_millis(ms);
        }

        config
    }

    /// Set the JSON-RPC endpoint.
    #[must_use]
    pub fn with_jsonrpc_url(mut self, url: impl Into<String>) -> Self {
        self.jsonrpc_url = url.into();
        self
    }

    /// Set the push endpoint.
    #[must_use]
    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    /// Set the request id sent with every command.
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    /// Set the RPC secret token.
    #[must_use]
    pub fn with_rpc_secret(mut self, secret: impl Into<String>) -> Self {
        self.rpc_secret = Some(secret.into());
        self
    }

    /// Set an explicit engine executable.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Set the download directory.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set the RPC port and derive matching endpoints on localhost.
    #[must_use]
    pub fn with_rpc_port(mut self, port: u16) -> Self {
        self.rpc_port = port;
        self.jsonrpc_url = format!("http://localhost:{port}/jsonrpc");
        self.websocket_url = format!("ws://localhost:{port}/jsonrpc");
        self
    }

    /// Set the BitTorrent listen port.
    #[must_use]
    pub const fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the maximum number of parallel downloads.
    #[must_use]
    pub const fn with_max_concurrent_downloads(mut self, max: u32) -> Self {
        self.max_concurrent_downloads = max;
        self
    }

    /// Set overall transfer limits in bytes/s (0 = unlimited).
    #[must_use]
    pub const fn with_limits(mut self, download: u64, upload: u64) -> Self {
        self.max_download_limit = download;
        self.max_upload_limit = upload;
        self
    }

    /// Set the progress poll interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the per-command timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.jsonrpc_url.starts_with("http://") && !self.jsonrpc_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.jsonrpc_url.clone()));
        }
        if !self.websocket_url.starts_with("ws://") && !self.websocket_url.starts_with("wss://") {
            return Err(ConfigError::InvalidUrl(self.websocket_url.clone()));
        }
        if self.rpc_port < 1024 {
            return Err(ConfigError::InvalidPort(self.rpc_port));
        }
        if self.listen_port < 1024 {
            return Err(ConfigError::InvalidPort(self.listen_port));
        }
        if self.rpc_port == self.listen_port {
            return Err(ConfigError::PortConflict(self.rpc_port));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDownloadDir);
        }
        if self.progress_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Endpoint URL has an unsupported scheme: {0}")]
    InvalidUrl(String),

    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("RPC port and listen port must differ, both are {0}")]
    PortConflict(u16),

    #[error("Max concurrent downloads must be at least 1")]
    InvalidConcurrency,

    #[error("Download directory cannot be empty")]
    EmptyDownloadDir,

    #[error("Progress interval must be greater than zero")]
    ZeroInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::new();
        assert_eq!(config.jsonrpc_url, "http://localhost:6800/jsonrpc");
        assert_eq!(config.websocket_url, "ws://localhost:6800/jsonrpc");
        assert_eq!(config.jsonrpc_version, "2.0");
        assert_eq!(config.rpc_port, 6800);
        assert!(config.rpc_secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_rpc_port(16800)
            .with_rpc_secret("s3cret")
            .with_download_dir("/srv/downloads")
            .with_limits(1024, 512)
            .with_max_concurrent_downloads(2);

        assert_eq!(config.jsonrpc_url, "http://localhost:16800/jsonrpc");
        assert_eq!(config.websocket_url, "ws://localhost:16800/jsonrpc");
        assert_eq!(config.rpc_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.download_dir, PathBuf::from("/srv/downloads"));
        assert_eq!(config.max_download_limit, 1024);
        assert_eq!(config.max_upload_limit, 512);
        assert_eq!(config.max_concurrent_downloads, 2);
    }

    #[test]
    fn test_from_lookup_overlays_values() {
        let vars: HashMap<&str, &str> = [
            ("ARIABRIDGE_RPC_URL", "http://10.0.0.2:6800/jsonrpc"),
            ("ARIABRIDGE_RPC_SECRET", "tok"),
            ("ARIABRIDGE_MAX_CONCURRENT", "3"),
            ("ARIABRIDGE_PROGRESS_INTERVAL_MS", "250"),
            ("ARIABRIDGE_RPC_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.jsonrpc_url, "http://10.0.0.2:6800/jsonrpc");
        assert_eq!(config.rpc_secret.as_deref(), Some("tok"));
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.progress_interval, Duration::from_millis(250));
        // Unparseable values keep the default
        assert_eq!(config.rpc_port, DEFAULT_RPC_PORT);
    }

    #[test]
    fn test_empty_secret_is_ignored() {
        let config = EngineConfig::from_lookup(|key| {
            (key == "ARIABRIDGE_RPC_SECRET").then(String::new)
        });
        assert!(config.rpc_secret.is_none());
    }

    #[test]
    fn test_validation_failures() {
        let bad_url = EngineConfig::new().with_jsonrpc_url("ftp://host/jsonrpc");
        assert!(matches!(bad_url.validate(), Err(ConfigError::InvalidUrl(_))));

        let privileged = EngineConfig::new().with_rpc_port(80);
        assert_eq!(privileged.validate(), Err(ConfigError::InvalidPort(80)));

        let conflict = EngineConfig::new().with_rpc_port(7000).with_listen_port(7000);
        assert_eq!(conflict.validate(), Err(ConfigError::PortConflict(7000)));

        let none = EngineConfig::new().with_max_concurrent_downloads(0);
        assert_eq!(none.validate(), Err(ConfigError::InvalidConcurrency));

        let zero = EngineConfig::new().with_progress_interval(Duration::ZERO);
        assert_eq!(zero.validate(), Err(ConfigError::ZeroInterval));
    }
}

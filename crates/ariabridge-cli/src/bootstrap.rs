//! CLI bootstrap - the composition root.
//!
//! The only place where the command channel and the download client are
//! wired together. Handlers receive the composed [`CliContext`].

use std::sync::Arc;

use ariabridge_client::DownloadClient;
use ariabridge_core::EngineConfig;
use ariabridge_rpc::JsonRpcChannel;
use tracing::debug;

use crate::commands::ServeArgs;
use crate::error::CliError;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub engine: EngineConfig,
}

impl CliConfig {
    /// `ARIABRIDGE_*` environment, overlaid with the global flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut engine = EngineConfig::from_env();
        if let Some(url) = &cli.rpc_url {
            engine = engine.with_jsonrpc_url(url);
        }
        if let Some(secret) = &cli.secret {
            engine = engine.with_rpc_secret(secret);
        }
        engine
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(Self { engine })
    }

    /// Apply `serve` overrides.
    ///
    /// A new RPC port also moves the endpoints, unless `--rpc-url` was given.
    #[must_use]
    pub fn with_serve_args(mut self, args: &ServeArgs, explicit_url: bool) -> Self {
        if let Some(port) = args.rpc_port {
            let url = self.engine.jsonrpc_url.clone();
            self.engine = self.engine.with_rpc_port(port);
            if explicit_url {
                self.engine = self.engine.with_jsonrpc_url(url);
            }
        }
        if let Some(port) = args.listen_port {
            self.engine = self.engine.with_listen_port(port);
        }
        if let Some(max) = args.max_concurrent {
            self.engine = self.engine.with_max_concurrent_downloads(max);
        }
        if let Some(dir) = &args.dir {
            self.engine = self.engine.with_download_dir(dir);
        }
        if let Some(path) = &args.executable {
            self.engine = self.engine.with_executable(path);
        }
        self
    }
}

/// Composed context for command handlers.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: EngineConfig,
    pub client: DownloadClient,
}

/// Build the command channel and the download client.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let channel = JsonRpcChannel::new(&config.engine)?;
    debug!(target: "ariabridge.cli", url = %channel.url(), "Connecting to engine");
    let client = DownloadClient::new(Arc::new(channel));
    Ok(CliContext {
        config: config.engine,
        client,
    })
}

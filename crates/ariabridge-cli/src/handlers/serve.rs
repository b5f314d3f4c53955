//! Serve command: run the engine in the foreground.

use std::time::Duration;

use ariabridge_runtime::{EngineProcess, wait_for_rpc};
use tracing::{info, warn};

use crate::bootstrap::{CliConfig, bootstrap};
use crate::error::CliError;

/// Launch the engine, wait for its RPC port and keep it running until
/// Ctrl-C or until it exits on its own.
pub async fn execute(config: CliConfig, ready_timeout: Duration) -> Result<(), CliError> {
    let rpc_port = config.engine.rpc_port;
    let mut process = EngineProcess::spawn(&config.engine).await?;

    if let Err(e) = wait_for_rpc(rpc_port, ready_timeout).await {
        warn!(target: "ariabridge.cli", error = %e, "Engine never opened its RPC port");
        if let Err(stop) = process.shutdown().await {
            warn!(target: "ariabridge.cli", error = %stop, "Failed to stop engine");
        }
        return Err(e.into());
    }

    let ctx = bootstrap(config)?;
    match ctx.client.version().await {
        Ok(version) => info!(target: "ariabridge.cli", version = %version.version, "Engine answered"),
        Err(e) => warn!(target: "ariabridge.cli", error = %e, "Engine did not answer getVersion"),
    }

    println!(
        "aria2 running (pid {}) at {}, downloading into {}",
        process.pid(),
        ctx.config.jsonrpc_url,
        ctx.config.download_dir.display()
    );
    println!("Press Ctrl-C to stop");

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.map_err(CliError::from),
        exited = process.exited() => Err(exited.into()),
    };
    outcome?;

    info!(target: "ariabridge.cli", "Stopping engine");
    process.shutdown().await?;
    println!("aria2 stopped");
    Ok(())
}

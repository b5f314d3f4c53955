//! Submission commands.

use std::path::Path;
use std::time::Duration;

use ariabridge_core::{Gid, StatusTag};
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::progress_line;

/// Submit `url`, optionally polling until it finishes.
pub async fn execute(
    ctx: &CliContext,
    url: &str,
    wait: bool,
    poll_every: Duration,
) -> Result<(), CliError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CliError::Arguments("url cannot be empty".to_string()));
    }

    let gid = ctx.client.add_url(url).await?;
    println!("{gid}");

    if wait {
        wait_until_done(ctx, &gid, poll_every).await?;
    }
    Ok(())
}

/// Submit a local `.torrent` file.
pub async fn torrent(ctx: &CliContext, file: &Path) -> Result<(), CliError> {
    let gid = ctx.client.add_torrent_file(file).await?;
    println!("{gid}");
    Ok(())
}

async fn wait_until_done(ctx: &CliContext, gid: &Gid, poll_every: Duration) -> Result<(), CliError> {
    let mut ticker = interval(poll_every.max(Duration::from_millis(100)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let status = ctx.client.status(gid).await?;
        debug!(target: "ariabridge.cli", %gid, status = %status.status, "Polled");
        eprintln!("{}", progress_line(&status));

        match status.status {
            StatusTag::Complete => {
                if let Some(path) = status.primary_path() {
                    println!("{path}");
                }
                return Ok(());
            }
            StatusTag::Error => {
                let message = status
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                return Err(CliError::DownloadFailed {
                    gid: gid.clone(),
                    message,
                });
            }
            StatusTag::Removed => {
                return Err(CliError::DownloadFailed {
                    gid: gid.clone(),
                    message: "removed before completion".to_string(),
                });
            }
            StatusTag::Waiting | StatusTag::Active | StatusTag::Paused => {}
        }
    }
}

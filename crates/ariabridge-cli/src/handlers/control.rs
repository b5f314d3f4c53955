//! Control commands for existing downloads and the engine itself.

use std::path::Path;

use ariabridge_core::Gid;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Operation applied to a single download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Stop,
    Remove,
}

/// Apply `control` to `gid`.
pub async fn execute(ctx: &CliContext, control: Control, gid: &str) -> Result<(), CliError> {
    let gid = Gid::from(gid);
    match control {
        Control::Pause => {
            let gid = ctx.client.pause(&gid).await?;
            println!("Paused {gid}");
        }
        Control::Resume => {
            let gid = ctx.client.resume(&gid).await?;
            println!("Resumed {gid}");
        }
        Control::Stop => {
            let gid = ctx.client.stop(&gid).await?;
            println!("Stopped {gid}");
        }
        Control::Remove => {
            ctx.client.remove(&gid).await?;
            println!("Removed result of {gid}");
        }
    }
    Ok(())
}

pub async fn purge(ctx: &CliContext) -> Result<(), CliError> {
    ctx.client.purge().await?;
    println!("Purged finished downloads");
    Ok(())
}

pub async fn shutdown(ctx: &CliContext) -> Result<(), CliError> {
    ctx.client.shutdown().await?;
    println!("Engine shutting down");
    Ok(())
}

/// Point new downloads at `path`.
pub async fn set_dir(ctx: &CliContext, path: &Path) -> Result<(), CliError> {
    if path.as_os_str().is_empty() {
        return Err(CliError::Arguments("download directory cannot be empty".to_string()));
    }
    ctx.client.change_destination_path(path).await?;
    println!("Downloads now go to {}", path.display());
    Ok(())
}

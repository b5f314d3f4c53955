//! Status and version commands.

use ariabridge_core::Gid;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::status_report;

/// Print the status of `gid`, as a report or raw JSON.
pub async fn execute(ctx: &CliContext, gid: &str, json: bool) -> Result<(), CliError> {
    let status = ctx.client.status(&Gid::from(gid)).await?;
    if json {
        let text = serde_json::to_string_pretty(&status)
            .map_err(|e| CliError::Io(format!("failed to encode status: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", status_report(&status));
    }
    Ok(())
}

/// Print the engine version and its compiled-in features.
pub async fn version(ctx: &CliContext) -> Result<(), CliError> {
    let version = ctx.client.version().await?;
    println!("aria2 {}", version.version);
    if !version.enabled_features.is_empty() {
        println!("features: {}", version.enabled_features.join(", "));
    }
    Ok(())
}

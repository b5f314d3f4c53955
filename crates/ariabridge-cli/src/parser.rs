//! Root CLI parser and global options.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for supervising and driving an aria2 engine.
#[derive(Parser, Debug)]
#[command(name = "ariabridge")]
#[command(about = "Supervise an aria2 engine and manage its downloads")]
#[command(version)]
pub struct Cli {
    /// JSON-RPC endpoint of the engine
    #[arg(long = "rpc-url", env = "ARIABRIDGE_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// RPC secret token
    #[arg(long, env = "ARIABRIDGE_RPC_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

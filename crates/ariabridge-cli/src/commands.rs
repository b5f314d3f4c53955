//! Subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the aria2 engine and keep it running until Ctrl-C
    Serve(ServeArgs),

    /// Submit a URL for download
    Add {
        /// URL to download
        url: String,
        /// Poll until the download finishes
        #[arg(short, long)]
        wait: bool,
        /// Seconds between polls when waiting
        #[arg(long, default_value_t = 1)]
        interval: u64,
    },

    /// Submit a local .torrent file
    AddTorrent {
        /// Path to the .torrent file
        file: PathBuf,
    },

    /// Show the status of a download
    Status {
        /// Download gid
        gid: String,
        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pause a download
    Pause { gid: String },

    /// Resume a paused download
    Resume { gid: String },

    /// Stop a download
    Stop { gid: String },

    /// Forget a stopped download's result
    Remove { gid: String },

    /// Forget every finished download result
    Purge,

    /// Shut the engine down
    Shutdown,

    /// Change the engine's download directory
    SetDir {
        /// New download directory
        path: PathBuf,
    },

    /// Show the engine version
    Version,
}

/// Overrides for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Download directory
    #[arg(long, env = "ARIABRIDGE_DOWNLOAD_DIR")]
    pub dir: Option<PathBuf>,

    /// RPC listen port
    #[arg(long = "rpc-port")]
    pub rpc_port: Option<u16>,

    /// BitTorrent listen port
    #[arg(long = "listen-port")]
    pub listen_port: Option<u16>,

    /// Maximum parallel downloads
    #[arg(long = "max-concurrent")]
    pub max_concurrent: Option<u32>,

    /// Path to the aria2c executable
    #[arg(long = "aria2c", env = "ARIABRIDGE_ARIA2C")]
    pub executable: Option<PathBuf>,

    /// Seconds to wait for the RPC port to open
    #[arg(long = "ready-timeout", default_value_t = 10)]
    pub ready_timeout: u64,
}

//! Engine command line.

use ariabridge_core::EngineConfig;

/// Build the engine's arguments.
///
/// `parent_pid` is passed as `--stop-with-process` so the engine exits with
/// its supervisor. Torrents are never followed automatically; metafile
/// downloads are resubmitted by the client instead.
pub fn engine_args(config: &EngineConfig, parent_pid: u32) -> Vec<String> {
    let mut args = vec![
        "--enable-rpc".to_string(),
        format!("--dir={}", config.download_dir.display().to_string().trim()),
        "--quiet".to_string(),
        format!("--listen-port={}", config.listen_port),
        format!("--rpc-listen-port={}", config.rpc_port),
        "--follow-torrent=false".to_string(),
        "--file-allocation=trunc".to_string(),
        "-c".to_string(),
        "--show-console-readout=false".to_string(),
        format!("--stop-with-process={parent_pid}"),
        format!("--max-concurrent-downloads={}", config.max_concurrent_downloads),
        format!("--max-overall-download-limit={}", config.max_download_limit),
        format!("--max-overall-upload-limit={}", config.max_upload_limit),
        "--auto-save-interval=1".to_string(),
    ];

    if let Some(secret) = &config.rpc_secret {
        args.push(format!("--rpc-secret={secret}"));
    }

    args
}

//! Terminal formatting of download snapshots.

use std::fmt::Write as _;

use ariabridge_core::DownloadStatus;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Human-readable byte count.
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// One-line progress summary.
pub fn progress_line(status: &DownloadStatus) -> String {
    let mut line = format!(
        "{} {:>5.1}%  {} / {}  {}/s",
        status.status,
        status.progress_percent(),
        format_bytes(status.completed_length),
        format_bytes(status.total_length),
        format_bytes(status.download_speed),
    );
    if let Some(eta) = status.eta() {
        let _ = write!(line, "  eta {}s", eta.as_secs());
    }
    line
}

/// Multi-line status report.
pub fn status_report(status: &DownloadStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "gid:       {}", status.gid);
    let _ = writeln!(out, "progress:  {}", progress_line(status));
    if let Some(dir) = &status.dir {
        let _ = writeln!(out, "dir:       {dir}");
    }
    if let Some(code) = status.error_code() {
        let message = status.error_message.as_deref().unwrap_or("");
        let _ = writeln!(out, "error:     [{code}] {message}");
    }
    for file in &status.files {
        let _ = writeln!(out, "file:      {}", file.path);
    }
    out
}

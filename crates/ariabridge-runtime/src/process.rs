//! Engine process lifecycle.
//!
//! [`EngineProcess`] owns the spawned `aria2c` child. Its stdout and stderr
//! are drained line by line into `tracing` so the pipes never fill up, and
//! the child is killed if the handle is dropped without [`EngineProcess::shutdown`].

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use ariabridge_core::EngineConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[cfg(unix)]
use std::time::Duration;
#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::args::engine_args;
use crate::error::{EngineProcessError, EngineResult};
use crate::finder::locate_engine;

#[cfg(unix)]
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A running engine process.
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
    pid: u32,
    executable: PathBuf,
    drains: Vec<JoinHandle<()>>,
}

impl EngineProcess {
    /// Validate `config`, locate the engine and launch it.
    ///
    /// The download directory is created if missing.
    pub async fn spawn(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let executable = locate_engine(config)?;
        tokio::fs::create_dir_all(&config.download_dir).await?;

        let args = engine_args(config, std::process::id());
        Self::spawn_with(executable, &args)
    }

    /// Launch `executable` with explicit arguments.
    pub fn spawn_with<I, S>(executable: impl Into<PathBuf>, args: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let executable = executable.into();
        let mut child = Command::new(&executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineProcessError::spawn(&executable, e))?;

        let pid = child.id().ok_or_else(|| {
            EngineProcessError::spawn(
                &executable,
                io::Error::other("process exited before reporting a pid"),
            )
        })?;

        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(drain_output(stdout, pid, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(drain_output(stderr, pid, "stderr"));
        }

        info!(target: "ariabridge.runtime", pid, executable = %executable.display(), "Engine started");

        Ok(Self {
            child,
            pid,
            executable,
            drains,
        })
    }

    pub const fn pid(&self) -> u32 {
        self.pid
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// `Ok` while the engine runs; `Exited` once it has stopped on its own.
    pub fn try_status(&mut self) -> EngineResult<()> {
        match self.child.try_wait()? {
            None => Ok(()),
            Some(status) => {
                warn!(target: "ariabridge.runtime", pid = self.pid, %status, "Engine exited");
                Err(EngineProcessError::Exited {
                    code: status.code(),
                })
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.try_status().is_ok()
    }

    /// Wait for the engine to exit on its own.
    pub async fn exited(&mut self) -> EngineProcessError {
        match self.child.wait().await {
            Ok(status) => {
                warn!(target: "ariabridge.runtime", pid = self.pid, %status, "Engine exited");
                EngineProcessError::Exited {
                    code: status.code(),
                }
            }
            Err(e) => EngineProcessError::Io(e),
        }
    }

    /// Stop the engine and reap it.
    ///
    /// On unix the engine gets SIGTERM and a grace period before SIGKILL.
    pub async fn shutdown(mut self) -> EngineResult<ExitStatus> {
        info!(target: "ariabridge.runtime", pid = self.pid, "Stopping engine");
        let status = shutdown_child(&mut self.child).await?;

        for drain in self.drains.drain(..) {
            if let Err(e) = drain.await {
                debug!(target: "ariabridge.runtime", error = %e, "Output drain ended abnormally");
            }
        }

        info!(target: "ariabridge.runtime", pid = self.pid, %status, "Engine stopped");
        Ok(status)
    }
}

fn drain_output<R>(reader: R, pid: u32, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!(target: "ariabridge.engine", pid, stream, "{line}"),
                Ok(None) => break,
                Err(e) => {
                    debug!(target: "ariabridge.engine", pid, stream, error = %e, "Output read failed");
                    break;
                }
            }
        }
    })
}

#[cfg(unix)]
async fn shutdown_child(child: &mut Child) -> io::Result<ExitStatus> {
    // Already reaped.
    let Some(pid) = child.id() else {
        return child.wait().await;
    };
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(GRACE_PERIOD, child.wait()).await {
        return result;
    }

    warn!(target: "ariabridge.runtime", pid, "Engine ignored SIGTERM, killing");
    child.kill().await?;
    child.wait().await
}

#[cfg(not(unix))]
async fn shutdown_child(child: &mut Child) -> io::Result<ExitStatus> {
    child.kill().await?;
    child.wait().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_shutdown_sends_sigterm() {
        let process = EngineProcess::spawn_with("sleep", ["30"]).unwrap();
        assert!(process.pid() > 0);

        let status = process.shutdown().await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_exit_is_reported() {
        let mut process = EngineProcess::spawn_with("sh", ["-c", "exit 3"]).unwrap();
        sleep(Duration::from_millis(200)).await;

        assert!(!process.is_running());
        let err = process.try_status().unwrap_err();
        assert!(matches!(err, EngineProcessError::Exited { code: Some(3) }));

        // Reaped already; shutdown still succeeds.
        let status = process.shutdown().await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let err = EngineProcess::spawn_with("/nonexistent/aria2c", ["--enable-rpc"]).unwrap_err();
        assert!(matches!(err, EngineProcessError::Spawn { .. }));
    }
}

//! RPC readiness check.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::error::{EngineProcessError, EngineResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wait until the engine accepts TCP connections on `port`.
pub async fn wait_for_rpc(port: u16, timeout: Duration) -> EngineResult<()> {
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(_) => {
                info!(target: "ariabridge.runtime", port, attempt, "Engine RPC port is ready");
                return Ok(());
            }
            Err(e) => {
                debug!(target: "ariabridge.runtime", port, attempt, error = %e, "RPC port not ready");
            }
        }

        let waited = started.elapsed();
        if waited >= timeout {
            return Err(EngineProcessError::RpcTimeout { port, waited });
        }
        sleep(POLL_INTERVAL.min(timeout - waited)).await;
    }
}

//! Progress ticker.
//!
//! The engine does not push progress. The ticker periodically injects a
//! synthetic progress notification for each running download into the same
//! channel the transport writes to, so progress callbacks stay ordered with
//! engine notifications.

use std::time::Duration;

use ariabridge_core::{Notification, NotificationMethod};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::watcher::Watcher;

/// Spawn the ticker.
///
/// Progress is lossy: a tick that finds the channel full is skipped rather
/// than queued behind engine notifications.
pub fn spawn_progress_ticker(
    watcher: Watcher,
    notifications: mpsc::Sender<Notification>,
    period: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for gid in watcher.running_gids() {
                        match notifications.try_send(Notification::new(NotificationMethod::ProgressPoll, gid)) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                trace!(target: "ariabridge.watcher", "Channel full, skipping progress tick");
                                break;
                            }
                            Err(TrySendError::Closed(_)) => {
                                debug!(target: "ariabridge.watcher", "Channel closed, progress ticker stopping");
                                return;
                            }
                        }
                    }
                }
                () = cancel_token.cancelled() => {
                    debug!(target: "ariabridge.watcher", "Progress ticker cancelled");
                    break;
                }
            }
        }
    })
}

//! Notification pump: feeds the watcher from the push transport.
//!
//! Notifications are dispatched one at a time, in arrival order. The pump
//! ends when the sender side closes or the cancellation token fires.

use ariabridge_core::Notification;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::watcher::Watcher;

/// Default capacity for the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Create the channel the transport and progress ticker write into.
pub fn notification_channel() -> (mpsc::Sender<Notification>, mpsc::Receiver<Notification>) {
    mpsc::channel(DEFAULT_CHANNEL_CAPACITY)
}

/// Spawn the dispatch loop.
pub fn spawn_pump(
    watcher: Watcher,
    mut notifications: mpsc::Receiver<Notification>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(target: "ariabridge.watcher", "Notification pump started");
        loop {
            tokio::select! {
                next = notifications.recv() => {
                    let Some(notification) = next else {
                        // The transport is gone; registered subscriptions will never fire
                        warn!(
                            target: "ariabridge.watcher",
                            subscriptions = watcher.subscription_count(),
                            "Notification channel closed"
                        );
                        break;
                    };
                    watcher.dispatch(notification).await;
                }
                () = cancel_token.cancelled() => {
                    debug!(target: "ariabridge.watcher", "Notification pump cancelled");
                    break;
                }
            }
        }
    })
}

//! Notification correlation for ariabridge.
//!
//! The engine pushes `(method, gid)` notifications over one shared channel.
//! This crate turns them into per-download lifecycle callbacks:
//!
//! - [`Watcher`] - registry of subscriptions and the dispatch algorithm
//! - [`HistoryStore`] - locator → gid for in-flight submissions
//! - [`spawn_pump`] - drains the notification channel into the watcher
//! - [`spawn_progress_ticker`] - synthesizes progress notifications
//!
//! # Example
//!
//! ```ignore
//! let watcher = Watcher::new();
//! let cell = GidCell::new();
//! let handle = watcher.subscribe_download(
//!     DownloadWatch::new(url, cell.resolver(), builder)
//!         .with_handlers(DownloadHandlers::new().on_completed(|args| println!("{}", args.locator))),
//! );
//! ```

mod history;
mod pump;
mod registry;
mod subscription;
mod ticker;
mod watcher;

pub use history::{HistoryEntry, HistoryStore};
pub use pump::{DEFAULT_CHANNEL_CAPACITY, notification_channel, spawn_pump};
pub use registry::{DownloadPhase, PENDING_CAPACITY};
pub use subscription::{
    DownloadHandler, DownloadHandlers, DownloadWatch, GidCell, GidResolver, Handling,
    MethodCallback, SubscriptionSet, SubscriptionToken,
};
pub use ticker::spawn_progress_ticker;
pub use watcher::{SubscriptionHandle, Watcher};

//! Download client facade for ariabridge.
//!
//! [`DownloadClient`] is what applications hold: it submits downloads,
//! controls them, and publishes their lifecycle on an [`EventHub`]. It sits
//! on top of any `CommandChannel` and a `Watcher` fed by the engine's push
//! notifications.

#![deny(unused_crate_dependencies)]

mod client;
mod events;
mod poller;

pub use client::{DownloadClient, EngineVersion};
pub use events::{DownloadEvent, EventHub, Listener, ListenerToken};
pub use poller::{FullStatusBuilder, PROGRESS_FIELDS, ProgressEnrichment, StatusPoller};

// Integration-test-only dependencies
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;

//! Core domain types and port definitions for ariabridge.
//!
//! ariabridge supervises an external aria2 download engine and turns its
//! asynchronous push notifications into typed, gid-correlated callbacks.
//! This crate holds only pure data types and trait definitions; no I/O,
//! networking, or runtime dependencies are allowed here.
//!
//! # Structure
//!
//! - `gid` - The engine-assigned download identifier
//! - `status` - Status snapshots (`DownloadStatus`, `StatusTag`, `DownloadFile`)
//! - `notification` - Push notification methods and lifecycle stages
//! - `events` - Payload delivered to public event listeners
//! - `rpc` - Engine command methods
//! - `errors` - Error taxonomy shared by every adapter
//! - `config` - Engine/client configuration
//! - `ports` - Trait abstractions for the command channel and snapshot pipeline

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod errors;
pub mod events;
pub mod gid;
pub mod notification;
pub mod ports;
pub mod rpc;
pub mod status;

// Re-export commonly used types for convenience
pub use config::{ConfigError, EngineConfig};
pub use errors::{ClientError, ClientResult};
pub use events::DownloadEventArgs;
pub use gid::Gid;
pub use notification::{LifecycleStage, Notification, NotificationMethod};
pub use ports::{CommandChannel, Enrichment, SnapshotBuilder};
pub use rpc::RpcMethod;
pub use status::{DownloadFile, DownloadStatus, FileUri, StatusTag};

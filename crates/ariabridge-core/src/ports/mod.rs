//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the correlator and the facade expect from
//! infrastructure. They contain no transport details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No `reqwest` or socket types in any signature
//! - Engine error envelopes surface as `ClientError::Engine`
//! - Snapshot building is async because it usually polls the engine

pub mod command_channel;
pub mod snapshot;

pub use command_channel::CommandChannel;
pub use snapshot::{Enrichment, SnapshotBuilder};

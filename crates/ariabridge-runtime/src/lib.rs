//! Engine process runtime for ariabridge.
//!
//! Locates `aria2c`, builds its command line from an [`EngineConfig`],
//! supervises the child process and waits for its RPC port.
//!
//! [`EngineConfig`]: ariabridge_core::EngineConfig

#![deny(unused_crate_dependencies)]

mod args;
mod error;
mod finder;
mod health;
mod process;

pub use args::engine_args;
pub use error::{EngineProcessError, EngineResult};
pub use finder::{ENGINE_BINARY, locate_engine};
pub use health::wait_for_rpc;
pub use process::EngineProcess;

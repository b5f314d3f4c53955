//! The `ariabridge` command-line tool.
//!
//! `main.rs` is the composition root; this library holds the parser, the
//! bootstrap wiring and the command handlers so they can be tested.

#![deny(unused_crate_dependencies)]

// Used by the binary only
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, ServeArgs};
pub use error::CliError;
pub use parser::Cli;

//! Command handlers.
//!
//! Handlers are thin: validate CLI input, call the download client or the
//! engine runtime, format the result for the terminal.

pub mod add;
pub mod control;
pub mod serve;
pub mod status;

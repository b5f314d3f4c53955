//! JSON-RPC transport for ariabridge.
//!
//! Two halves share one envelope format:
//!
//! - [`JsonRpcChannel`] - request/response commands over HTTP, implementing
//!   the `CommandChannel` port
//! - [`decode_frame`] / [`forward_frames`] - push notifications arriving as
//!   text frames on the socket, decoded into `Notification`s and forwarded
//!   to the watcher's channel
//!
//! The socket itself is owned by the embedding application; this crate only
//! consumes its text frames as a `Stream<Item = String>`.

#![deny(unused_crate_dependencies)]

mod envelope;
mod frames;
mod http;

pub use envelope::{RpcErrorBody, RpcRequest, RpcResponse, secret_params};
pub use frames::{FrameOutcome, decode_frame, forward_frames};
pub use http::JsonRpcChannel;

#[cfg(test)]
use tokio_test as _;

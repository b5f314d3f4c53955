//! Command channel port.
//!
//! The command channel sends one method call to the engine and returns the
//! `result` member of the reply. Serialization, connection handling and
//! request/response correlation belong to the adapter.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ClientResult;
use crate::rpc::RpcMethod;

/// Port for issuing commands to the engine.
///
/// # Example
///
/// ```ignore
/// let value = channel
///     .call(RpcMethod::TellStatus, vec![json!(gid.as_str())])
///     .await?;
/// ```
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Issue `method` with positional `params`.
    ///
    /// A non-empty error envelope is returned as `ClientError::Engine`
    /// carrying the engine's code and message; it is never swallowed.
    async fn call(&self, method: RpcMethod, params: Vec<Value>) -> ClientResult<Value>;
}

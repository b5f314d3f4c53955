//! JSON-RPC 2.0 envelopes.

use ariabridge_core::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing command envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'a str,
    pub id: &'a str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

/// Error object inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Incoming response envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    /// Parse a raw reply body.
    pub fn parse(body: &str) -> ClientResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| ClientError::invalid_response(format!("not a JSON-RPC envelope: {e}")))
    }

    /// The `result` payload, or the engine error it carries.
    ///
    /// An envelope with neither field is treated as a `null` result.
    pub fn into_result(self) -> ClientResult<Value> {
        if let Some(error) = self.error {
            return Err(ClientError::engine(error.code, error.message));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Prepend the `token:<secret>` authorization parameter when a secret is set.
pub fn secret_params(secret: Option<&str>, params: Vec<Value>) -> Vec<Value> {
    match secret {
        Some(secret) => {
            let mut with_token = Vec::with_capacity(params.len() + 1);
            with_token.push(Value::String(format!("token:{secret}")));
            with_token.extend(params);
            with_token
        }
        None => params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "session",
            method: "aria2.addUri",
            params: vec![json!(["http://example.org/a.iso"])],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": "session",
                "method": "aria2.addUri",
                "params": [["http://example.org/a.iso"]]
            })
        );
    }

    #[test]
    fn test_request_without_params_omits_field() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "s",
            method: "aria2.getVersion",
            params: Vec::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("params").is_none());
    }

    #[test]
    fn test_secret_prefix() {
        let params = secret_params(Some("hunter2"), vec![json!("2089b05ecca3d829")]);
        assert_eq!(params, vec![json!("token:hunter2"), json!("2089b05ecca3d829")]);

        let untouched = secret_params(None, vec![json!(1)]);
        assert_eq!(untouched, vec![json!(1)]);
    }

    #[test]
    fn test_response_result() {
        let response = RpcResponse::parse(r#"{"id":"s","jsonrpc":"2.0","result":"2089b05ecca3d829"}"#)
            .unwrap();
        assert_eq!(response.into_result().unwrap(), json!("2089b05ecca3d829"));
    }

    #[test]
    fn test_response_error() {
        let response = RpcResponse::parse(
            r#"{"id":"s","jsonrpc":"2.0","error":{"code":1,"message":"GID 0 is not found"}}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_result().unwrap_err(),
            ClientError::engine(1, "GID 0 is not found")
        );
    }

    #[test]
    fn test_garbage_is_invalid_response() {
        let err = RpcResponse::parse("<html>").unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }
}

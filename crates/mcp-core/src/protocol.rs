//! JSON-RPC 2.0 wire types for the Model Context Protocol
//!
//! This module implements the framing layer (L1): request/response/notification
//! envelopes, batch decoding, and the JSON-RPC + MCP error code constants. It
//! has no knowledge of sessions, transports, or tool dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC "Parse error" (-32700)
pub const PARSE_ERROR: i32 = -32700;
/// JSON-RPC "Invalid Request" (-32600)
pub const INVALID_REQUEST: i32 = -32600;
/// JSON-RPC "Method not found" (-32601)
pub const METHOD_NOT_FOUND: i32 = -32601;
/// JSON-RPC "Invalid params" (-32602)
pub const INVALID_PARAMS: i32 = -32602;
/// JSON-RPC "Internal error" (-32603)
pub const INTERNAL_ERROR: i32 = -32603;
/// MCP extension: prompt not found
pub const PROMPT_NOT_FOUND: i32 = -32000;
/// MCP extension: resource not found
pub const RESOURCE_NOT_FOUND: i32 = -32001;
/// MCP extension: tool not found
pub const TOOL_NOT_FOUND: i32 = -32002;
/// MCP extension: method recognized but not implemented
pub const NOT_IMPLEMENTED: i32 = -32003;

/// JSON-RPC request (or notification, when `id` is absent/null)
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version, must be "2.0"
    pub jsonrpc: String,

    /// Request id. Absent or null marks a notification.
    #[serde(default)]
    pub id: Option<Value>,

    /// Dotted MCP method name
    pub method: String,

    /// Method parameters
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response: exactly one of `result`/`error` is set
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: &'static str,

    /// Echoes the request id (`Value::Null` for parse errors with no recoverable id)
    pub id: Value,

    /// Result payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Numeric error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Structured diagnostic data, e.g. the offending field name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Build a success response
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response with no structured data
    #[must_use]
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    /// Build an error response carrying structured diagnostic data
    #[must_use]
    pub fn error_with_data(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }
}

/// A decoded JSON-RPC payload: a single message or a batch array
#[derive(Debug)]
pub enum IncomingMessage {
    /// A single request or notification
    Single(JsonRpcRequest),
    /// A JSON array of requests/notifications, dispatched independently
    Batch(Vec<JsonRpcRequest>),
}

/// Error produced while decoding raw bytes into an [`IncomingMessage`]
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The bytes were not valid JSON, or not a JSON-RPC 2.0 envelope
    #[error("parse error: {0}")]
    Parse(String),

    /// The envelope was valid JSON but violated JSON-RPC framing rules
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Decode a raw JSON-RPC frame into a single request or a batch
///
/// # Errors
///
/// Returns [`ProtocolError::Parse`] if `raw` is not valid JSON, and
/// [`ProtocolError::InvalidRequest`] if it decodes but is not `"2.0"`
/// framing, or is an empty batch array.
pub fn decode_message(raw: &str) -> Result<IncomingMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| ProtocolError::Parse(e.to_string()))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(ProtocolError::InvalidRequest("empty batch".to_string()));
            }
            let mut requests = Vec::with_capacity(items.len());
            for item in items {
                requests.push(decode_single(item)?);
            }
            Ok(IncomingMessage::Batch(requests))
        }
        other => Ok(IncomingMessage::Single(decode_single(other)?)),
    }
}

fn decode_single(value: Value) -> Result<JsonRpcRequest, ProtocolError> {
    let request: JsonRpcRequest =
        serde_json::from_value(value).map_err(|e| ProtocolError::Parse(e.to_string()))?;

    if request.jsonrpc != "2.0" {
        return Err(ProtocolError::InvalidRequest(format!(
            "unsupported jsonrpc version: {}",
            request.jsonrpc
        )));
    }

    Ok(request)
}

/// A request with an absent or null `id` is a notification: no [`JsonRpcResponse`]
/// is ever produced for it.
#[must_use]
pub fn is_notification(request: &JsonRpcRequest) -> bool {
    matches!(request.id, None | Some(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_request() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        match decode_message(raw).unwrap() {
            IncomingMessage::Single(req) => {
                assert_eq!(req.method, "ping");
                assert!(!is_notification(&req));
            }
            IncomingMessage::Batch(_) => panic!("expected single"),
        }
    }

    #[test]
    fn decodes_notification_without_id() {
        let raw = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        match decode_message(raw).unwrap() {
            IncomingMessage::Single(req) => assert!(is_notification(&req)),
            IncomingMessage::Batch(_) => panic!("expected single"),
        }
    }

    #[test]
    fn rejects_wrong_jsonrpc_version() {
        let raw = r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#;
        assert!(matches!(
            decode_message(raw),
            Err(ProtocolError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        let raw = "{not json";
        assert!(matches!(decode_message(raw), Err(ProtocolError::Parse(_))));
    }

    #[test]
    fn rejects_empty_batch() {
        let raw = "[]";
        assert!(matches!(
            decode_message(raw),
            Err(ProtocolError::InvalidRequest(_))
        ));
    }

    #[test]
    fn decodes_batch_of_mixed_requests_and_notifications() {
        let raw = r#"[
            {"jsonrpc":"2.0","id":1,"method":"ping"},
            {"jsonrpc":"2.0","method":"notifications/initialized"}
        ]"#;
        match decode_message(raw).unwrap() {
            IncomingMessage::Batch(reqs) => {
                assert_eq!(reqs.len(), 2);
                assert!(!is_notification(&reqs[0]));
                assert!(is_notification(&reqs[1]));
            }
            IncomingMessage::Single(_) => panic!("expected batch"),
        }
    }

    #[test]
    fn success_and_error_responses_are_mutually_exclusive() {
        let ok = JsonRpcResponse::success(Value::from(1), serde_json::json!({}));
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());

        let err = JsonRpcResponse::error(Value::from(1), METHOD_NOT_FOUND, "nope");
        assert!(err.result.is_none());
        assert!(err.error.is_some());
    }
}

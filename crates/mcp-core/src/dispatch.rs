//! Request routing and the `initialize` capability handshake (L3 + §4.5)
//!
//! The [`Dispatcher`] owns a [`ProviderRegistry`] and routes a decoded
//! [`JsonRpcRequest`] to the right handler, shaping both successes and
//! JSON-RPC errors. It has no opinion about how bytes arrived (that's the
//! transport's job) or where the session came from (the caller resolves one
//! via [`SessionStore`] and passes it in).

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::{self, decode_message, is_notification, IncomingMessage, JsonRpcRequest, JsonRpcResponse};
use crate::providers::{ProviderError, ProviderRegistry, SubscriptionSink};
use crate::session::{Session, SUBSCRIPTION_SINK_KEY};

/// Errors the dispatcher can map to a JSON-RPC error response
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// `request.method` has no route
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Parameters failed to deserialize against the expected shape
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// A handler panicked; caught at the dispatcher boundary
    #[error("internal error: {0}")]
    Internal(String),

    /// Propagated straight from a provider
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DispatchError {
    /// Map to the JSON-RPC / MCP error code this error represents
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => protocol::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => protocol::INVALID_PARAMS,
            Self::Internal(_) => protocol::INTERNAL_ERROR,
            Self::Provider(e) => match e {
                ProviderError::InvalidParams(_) => protocol::INVALID_PARAMS,
                ProviderError::ToolNotFound(_) => protocol::TOOL_NOT_FOUND,
                ProviderError::PromptNotFound(_) => protocol::PROMPT_NOT_FOUND,
                ProviderError::ResourceNotFound(_) => protocol::RESOURCE_NOT_FOUND,
                ProviderError::NotImplemented(_) => protocol::NOT_IMPLEMENTED,
                ProviderError::DuplicateToolName(_) | ProviderError::Internal(_) => {
                    protocol::INTERNAL_ERROR
                }
            },
        }
    }

    /// Structured `data` field to attach to the JSON-RPC error, when the
    /// error names an offending field.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::InvalidParams(field) | Self::Provider(ProviderError::InvalidParams(field)) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

/// Static identity reported during `initialize`
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoPayload {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolCapabilities {
    list_changed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceCapabilities {
    subscribe: bool,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<ToolCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompts: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<ResourceCapabilities>,
}

const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Routes decoded requests to provider methods and shapes the `initialize`
/// handshake. One `Dispatcher` is shared (via `Arc`) across every connection
/// a [`crate::server::McpServer`] serves.
pub struct Dispatcher {
    registry: ProviderRegistry,
    info: ServerInfo,
}

impl Dispatcher {
    /// Build a dispatcher over a fully-populated provider registry
    #[must_use]
    pub fn new(registry: ProviderRegistry, info: ServerInfo) -> Self {
        Self { registry, info }
    }

    /// Handle a non-notification request, returning the JSON-RPC `result`
    /// value on success.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for unknown methods, invalid params, or a
    /// provider-reported miss. Panics inside provider calls are caught and
    /// converted into [`DispatchError::Internal`].
    pub async fn handle_request(&self, session: &Session, request: &JsonRpcRequest) -> Result<Value, DispatchError> {
        let method = request.method.as_str();

        let outcome = AssertUnwindSafe(self.route(session, method, &request.params))
            .catch_unwind()
            .await;

        match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&panic);
                tracing::error!(method, panic = %message, "handler panicked");
                Err(DispatchError::Internal(message))
            }
        }
    }

    async fn route(&self, session: &Session, method: &str, params: &Value) -> Result<Value, DispatchError> {
        match method {
            "initialize" => self.handle_initialize(session, params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_tools_list(params).await,
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => self.handle_prompts_list(params).await,
            "prompts/get" => self.handle_prompts_get(params).await,
            "resources/list" => self.handle_resources_list(params).await,
            "resources/read" => self.handle_resources_read(params).await,
            "resources/subscribe" => self.handle_resources_subscribe(session, params).await,
            other if other.starts_with("notifications/") => Ok(Value::Null),
            other => Err(DispatchError::MethodNotFound(other.to_string())),
        }
    }

    /// Handle a notification (no response is ever produced). Failures are
    /// logged, never surfaced to the client.
    pub async fn handle_notification(&self, session: &Session, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => session.mark_initialized(),
            "notifications/cancelled" | "notifications/progress" => {}
            other if other.starts_with("notifications/") => {
                tracing::debug!(method = other, "unhandled notification");
            }
            other => {
                tracing::warn!(method = other, "notification for unknown method");
            }
        }
    }

    fn handle_initialize(&self, session: &Session, _params: &Value) -> Result<Value, DispatchError> {
        session.mark_initialized();

        let capabilities = ServerCapabilities {
            tools: self.registry.has_tools().then_some(ToolCapabilities { list_changed: false }),
            prompts: self.registry.has_prompts().then(serde_json::Map::new),
            resources: self.registry.has_resources().then_some(ResourceCapabilities {
                subscribe: self.registry.resources_support_subscribe(),
            }),
        };

        Ok(serde_json::json!({
            "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
            "serverInfo": ServerInfoPayload {
                name: self.info.name.clone(),
                version: self.info.version.clone(),
            },
            "capabilities": capabilities,
        }))
    }

    async fn handle_tools_list(&self, params: &Value) -> Result<Value, DispatchError> {
        let cursor = params.get("cursor").and_then(Value::as_str);
        let (tools, next_cursor) = self.registry.list_tools(cursor).await?;
        Ok(serde_json::json!({ "tools": tools, "nextCursor": next_cursor }))
    }

    async fn handle_tools_call(&self, params: &Value) -> Result<Value, DispatchError> {
        #[derive(serde::Deserialize)]
        struct ToolCallParams {
            name: String,
            #[serde(default)]
            arguments: Value,
        }

        let call: ToolCallParams =
            serde_json::from_value(params.clone()).map_err(|e| DispatchError::InvalidParams(e.to_string()))?;

        let result = self.registry.call_tool(&call.name, &call.arguments).await?;
        serde_json::to_value(result).map_err(|e| DispatchError::Internal(e.to_string()))
    }

    async fn handle_prompts_list(&self, params: &Value) -> Result<Value, DispatchError> {
        let cursor = params.get("cursor").and_then(Value::as_str);
        let (prompts, next_cursor) = self.registry.list_prompts(cursor).await?;
        Ok(serde_json::json!({ "prompts": prompts, "nextCursor": next_cursor }))
    }

    async fn handle_prompts_get(&self, params: &Value) -> Result<Value, DispatchError> {
        #[derive(serde::Deserialize)]
        struct PromptGetParams {
            name: String,
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let call: PromptGetParams =
            serde_json::from_value(params.clone()).map_err(|e| DispatchError::InvalidParams(e.to_string()))?;

        let messages = self.registry.get_prompt(&call.name, &call.arguments).await?;
        Ok(serde_json::json!({ "messages": messages }))
    }

    async fn handle_resources_list(&self, params: &Value) -> Result<Value, DispatchError> {
        let cursor = params.get("cursor").and_then(Value::as_str);
        let (resources, next_cursor) = self.registry.list_resources(cursor).await?;
        Ok(serde_json::json!({ "resources": resources, "nextCursor": next_cursor }))
    }

    async fn handle_resources_read(&self, params: &Value) -> Result<Value, DispatchError> {
        #[derive(serde::Deserialize)]
        struct ReadParams {
            uri: String,
        }
        let call: ReadParams =
            serde_json::from_value(params.clone()).map_err(|e| DispatchError::InvalidParams(e.to_string()))?;

        let contents = self.registry.read_resource(&call.uri).await?;
        Ok(serde_json::json!({ "contents": contents }))
    }

    async fn handle_resources_subscribe(&self, session: &Session, params: &Value) -> Result<Value, DispatchError> {
        #[derive(serde::Deserialize)]
        struct SubscribeParams {
            uri: String,
        }
        let call: SubscribeParams =
            serde_json::from_value(params.clone()).map_err(|e| DispatchError::InvalidParams(e.to_string()))?;

        // The owning transport registers a `SubscriptionSink` into the
        // session's data bag when the connection is established (stdio: a
        // channel to its writer task; SSE: the client's event channel).
        // Transports that never attach one (streamable-HTTP's GET stream is
        // not wired to push yet) leave subscribe unsupported on that
        // connection rather than silently claiming to have subscribed.
        let sink = session
            .with::<Arc<dyn SubscriptionSink>, _>(SUBSCRIPTION_SINK_KEY, Arc::clone)
            .ok_or_else(|| {
                ProviderError::NotImplemented("resources/subscribe: connection has no push channel".to_string())
            })?;

        self.registry.subscribe_resource(&call.uri, sink).await?;
        Ok(serde_json::json!({}))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Process one raw JSON-RPC frame end to end: decode, dispatch (including
/// batch fan-out), and return the JSON value to send back, or `None` when
/// the frame was a pure notification and no response is ever sent.
///
/// Shared by every transport so the decode/dispatch/encode state machine
/// (spec §4.8) lives in exactly one place.
pub async fn process_message(dispatcher: &Dispatcher, session: &Session, raw: &str) -> Option<Value> {
    let parsed = match decode_message(raw) {
        Ok(p) => p,
        Err(e) => {
            return Some(
                serde_json::to_value(JsonRpcResponse::error(Value::Null, protocol::PARSE_ERROR, e.to_string()))
                    .expect("JsonRpcResponse always serializes"),
            );
        }
    };

    match parsed {
        IncomingMessage::Single(request) => {
            if is_notification(&request) {
                dispatcher.handle_notification(session, &request).await;
                None
            } else {
                Some(encode_one(dispatcher, session, request).await)
            }
        }
        IncomingMessage::Batch(requests) => {
            let mut responses = Vec::new();
            for request in requests {
                if is_notification(&request) {
                    dispatcher.handle_notification(session, &request).await;
                } else {
                    responses.push(encode_one(dispatcher, session, request).await);
                }
            }
            Some(Value::Array(responses))
        }
    }
}

async fn encode_one(dispatcher: &Dispatcher, session: &Session, request: JsonRpcRequest) -> Value {
    let id = request.id.clone().unwrap_or(Value::Null);
    let response = match dispatcher.handle_request(session, &request).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => JsonRpcResponse::error_with_data(id, e.error_code(), e.to_string(), e.data()),
    };
    serde_json::to_value(response).expect("JsonRpcResponse always serializes")
}

//! Transport layer for MCP communication (L2)
//!
//! Three transports share one contract: decode a raw frame, hand it to a
//! [`RequestHandler`], write back whatever it returns. None of them know
//! about dispatch or providers; [`crate::server::McpServer`] wires a
//! [`crate::dispatch::Dispatcher`] in as the handler.

mod error;
mod sse;
mod stdio;
mod streamable_http;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use error::TransportError;
pub use sse::{SseConfig, SseTransport};
pub use stdio::StdioTransport;
pub use streamable_http::{StreamableHttpConfig, StreamableHttpTransport};

use crate::session::Session;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// What a transport hands every decoded frame to.
///
/// Implemented by [`crate::dispatch::Dispatcher`] via
/// [`crate::dispatch::process_message`]; transports never call
/// into `dispatch`/`providers` directly.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Process one raw JSON-RPC frame for `session`, returning the bytes to
    /// write back, or `None` when the frame was a pure notification.
    async fn handle_message(&self, session: &Session, raw: &str) -> Option<Value>;
}

/// Which transport a running [`Transport`] is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Newline-delimited JSON over stdin/stdout
    Stdio,
    /// Server-Sent Events over HTTP
    Sse,
    /// Single `/mcp` POST+GET route
    StreamableHttp,
}

/// Static identity of a running transport, for logging/diagnostics
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// Which transport this is
    pub kind: TransportKind,
    /// Bound address, for the HTTP-backed transports
    pub address: Option<String>,
}

/// A channel MCP messages flow over. The dispatcher and facade are
/// transport-agnostic; they only ever see this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run the transport until it is stopped or its connection ends,
    /// dispatching every decoded frame to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for I/O failure, bind failure, or a
    /// malformed frame the transport can't recover from.
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> Result<()>;

    /// Static identity of this transport
    fn info(&self) -> TransportInfo;

    /// Signal a running [`Self::start`] to wind down
    async fn stop(&self);
}

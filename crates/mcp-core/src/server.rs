//! Server facade tying one transport to one dispatcher (L7)
//!
//! ```text
//!   new() -> McpServer { idle }
//!   start(ctx) -> installs self as the transport's RequestHandler,
//!                 blocks on transport.start() until cancelled or the
//!                 connection ends
//!   stop(ctx)  -> cancels the transport, awaits its task, deletes every
//!                 session (running each one's registered cleanups)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::{process_message, Dispatcher};
use crate::session::Session;
use crate::transport::{RequestHandler, Transport, TransportError};

/// Errors raised by the server lifecycle
#[derive(Debug, Error)]
pub enum ServerError {
    /// The underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Ties a [`Dispatcher`] to a [`Transport`]. One `McpServer` serves exactly
/// one transport for its lifetime; session lifecycle is owned by whichever
/// transport accepted the connection (stdio: one session for the process
/// lifetime; SSE/streamable HTTP: one per client, created and torn down as
/// clients connect and disconnect).
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn Transport>,
}

impl McpServer {
    /// Build a server over an already-configured dispatcher and transport
    #[must_use]
    pub fn new(dispatcher: Dispatcher, transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            transport,
        }
    }

    /// Run until the transport stops on its own (stdin closed, signal
    /// received) or [`Self::stop`] is called from another task.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the transport fails to start.
    pub async fn start(&self) -> Result<(), ServerError> {
        let handler: Arc<dyn RequestHandler> = Arc::new(DispatchHandler {
            dispatcher: Arc::clone(&self.dispatcher),
        });
        self.transport.start(handler).await?;
        Ok(())
    }

    /// Signal the running transport to wind down
    pub async fn stop(&self) {
        self.transport.stop().await;
    }
}

/// Adapts a [`Dispatcher`] to the transport-facing [`RequestHandler`]
/// contract, resolving sessions from a shared [`SessionStore`].
struct DispatchHandler {
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl RequestHandler for DispatchHandler {
    async fn handle_message(&self, session: &Session, raw: &str) -> Option<Value> {
        process_message(&self.dispatcher, session, raw).await
    }
}

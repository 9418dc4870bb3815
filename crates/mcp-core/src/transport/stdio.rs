//! Stdio transport: newline-delimited JSON over stdin/stdout
//!
//! Reads JSON-RPC requests from stdin and dispatches each one on its own
//! task so slow tool calls don't stall the read loop; a dedicated writer
//! task serializes every response/notification back onto stdout in
//! whatever order they complete. The default transport for CLI-based MCP
//! clients.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{RequestHandler, Transport, TransportError, TransportInfo, TransportKind};
use crate::providers::SubscriptionSink;
use crate::session::{SessionStore, SUBSCRIPTION_SINK_KEY};

/// Stdio transport for MCP communication.
///
/// # Examples
///
/// ```rust,ignore
/// use mcp_core::transport::{StdioTransport, Transport};
///
/// let transport = StdioTransport::new();
/// transport.start(handler).await?;
/// ```
pub struct StdioTransport {
    cancel: CancellationToken,
}

impl StdioTransport {
    /// Create a new stdio transport
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Pushes a `resources/subscribe` change notification onto the writer
/// task's outbound queue, interleaved with ordinary responses.
struct StdioSink {
    tx: mpsc::UnboundedSender<Value>,
}

#[async_trait]
impl SubscriptionSink for StdioSink {
    async fn notify(&self, uri: &str) {
        let message = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/resources/updated",
            "params": { "uri": uri },
        });
        let _ = self.tx.send(message);
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> super::Result<()> {
        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);

        let sessions = SessionStore::new();
        let session = sessions.get_or_create(None);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
        session.set(SUBSCRIPTION_SINK_KEY, Arc::new(StdioSink { tx: out_tx.clone() }) as Arc<dyn SubscriptionSink>);

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(message) = out_rx.recv().await {
                let body = match serde_json::to_string(&message) {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to serialize outbound message");
                        continue;
                    }
                };
                if stdout.write_all(body.as_bytes()).await.is_err()
                    || stdout.write_all(b"\n").await.is_err()
                    || stdout.flush().await.is_err()
                {
                    tracing::warn!("stdout closed, stopping writer task");
                    break;
                }
            }
        });

        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(TransportError::Io)?;

        let mut in_flight = JoinSet::new();
        let mut line = String::new();
        loop {
            line.clear();

            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("stdio transport cancelled");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("received SIGINT, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                    break;
                }
                bytes_read = reader.read_line(&mut line) => {
                    let bytes_read = bytes_read?;
                    if bytes_read == 0 {
                        tracing::info!("stdin closed, shutting down");
                        break;
                    }

                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let raw = trimmed.to_string();
                    let handler = Arc::clone(&handler);
                    let session = Arc::clone(&session);
                    let out_tx = out_tx.clone();
                    in_flight.spawn(async move {
                        if let Some(response) = handler.handle_message(&session, &raw).await {
                            let _ = out_tx.send(response);
                        }
                    });
                }
            }
        }

        // Let every dispatched request finish and write its response before
        // this call returns, so no task outlives `start`.
        while in_flight.join_next().await.is_some() {}
        drop(out_tx);
        let _ = writer.await;

        // Stdio has exactly one session for the process's lifetime; run its
        // cleanup callbacks now that the connection is ending.
        sessions.delete(session.id);

        Ok(())
    }

    fn info(&self) -> TransportInfo {
        TransportInfo {
            kind: TransportKind::Stdio,
            address: None,
        }
    }

    async fn stop(&self) {
        self.cancel.cancel();
    }
}

//! SSE transport: HTTP server pairing a `GET /sse` event stream with a
//! `POST /message` JSON-RPC endpoint, keyed by a per-client session id.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use futures::Stream;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use super::error::TransportError;
use super::{RequestHandler, Transport, TransportInfo, TransportKind};
use crate::providers::SubscriptionSink;
use crate::session::{SessionStore, SUBSCRIPTION_SINK_KEY};

/// Depth of each client's SSE event channel; a full channel drops the
/// client rather than ever blocking dispatch.
const CHANNEL_DEPTH: usize = 100;

/// SSE transport configuration
#[derive(Debug, Clone)]
pub struct SseConfig {
    /// Port to listen on
    pub port: u16,
    /// Allowed `Origin` header values; empty means no restriction
    pub allowed_origins: Vec<String>,
}

impl SseConfig {
    /// Create a new SSE config listening on `port` with no origin restriction
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            allowed_origins: Vec::new(),
        }
    }
}

struct AppState {
    handler: Arc<dyn RequestHandler>,
    sessions: Arc<SessionStore>,
    clients: DashMap<Uuid, tokio::sync::mpsc::Sender<Result<Event, Infallible>>>,
}

/// SSE transport for MCP communication
pub struct SseTransport {
    config: SseConfig,
    cancel: CancellationToken,
}

impl SseTransport {
    /// Create a new SSE transport
    #[must_use]
    pub fn new(config: SseConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> super::Result<()> {
        let state = Arc::new(AppState {
            handler,
            sessions: Arc::new(SessionStore::new()),
            clients: DashMap::new(),
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .route("/sse", get(handle_sse))
            .route("/message", post(handle_message))
            .layer(cors)
            .with_state(state);

        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        tracing::info!(port = self.config.port, "SSE transport listening");

        let cancel = self.cancel.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))?;

        Ok(())
    }

    fn info(&self) -> TransportInfo {
        TransportInfo {
            kind: TransportKind::Sse,
            address: Some(format!("0.0.0.0:{}", self.config.port)),
        }
    }

    async fn stop(&self) {
        self.cancel.cancel();
    }
}

#[derive(Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<Uuid>,
}

/// Pushes a `resources/subscribe` change notification down a client's SSE
/// event channel, same backpressure policy as an ordinary response: a full
/// channel drops the notification rather than blocking the provider.
struct SseSink {
    tx: tokio::sync::mpsc::Sender<Result<Event, Infallible>>,
}

#[async_trait]
impl SubscriptionSink for SseSink {
    async fn notify(&self, uri: &str) {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/resources/updated",
            "params": { "uri": uri },
        });
        let event = Event::default().event("message").data(payload.to_string());
        let _ = self.tx.try_send(Ok(event));
    }
}

/// Drops a disconnected client's session and its entry in `state.clients`.
/// Attached to the SSE response stream so axum running it to completion (the
/// client going away, the connection future being dropped) is the one place
/// that ever needs to know about disconnect.
struct SessionGuard {
    state: Arc<AppState>,
    session_id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.clients.remove(&self.session_id);
        self.state.sessions.delete(self.session_id);
    }
}

/// Wraps a stream with a value that's dropped alongside it, so cleanup runs
/// whether the stream ends normally or is simply dropped mid-poll.
struct GuardedStream<S> {
    inner: S,
    _guard: SessionGuard,
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Handle a new SSE connection: allocate a session, register the client's
/// push channel (both for ordinary responses and resource-subscription
/// notifications), announce it via an `endpoint` event. The session and its
/// `state.clients` entry are removed when the client disconnects.
async fn handle_sse(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.sessions.get_or_create(None);
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(CHANNEL_DEPTH);

    let endpoint = serde_json::json!({ "uri": "/message", "sessionId": session.id });
    let _ = tx
        .send(Ok(Event::default().event("endpoint").data(endpoint.to_string())))
        .await;

    session.set(SUBSCRIPTION_SINK_KEY, Arc::new(SseSink { tx: tx.clone() }) as Arc<dyn SubscriptionSink>);
    state.clients.insert(session.id, tx);

    let guarded = GuardedStream {
        inner: ReceiverStream::new(rx),
        _guard: SessionGuard {
            state: Arc::clone(&state),
            session_id: session.id,
        },
    };

    Sse::new(guarded).keep_alive(KeepAlive::default())
}

/// Handle `POST /message`: resolve the session from the `sessionId` query
/// param (falling back to an implicit default session when absent), run it
/// through the handler, and push the reply down that client's SSE channel
/// (a full channel drops the client rather than blocking dispatch).
async fn handle_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, Response> {
    let session_id = query.session_id.or_else(|| {
        headers
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
    });

    let session = state.sessions.get_or_create(session_id);

    let Some(response) = state.handler.handle_message(&session, &body).await else {
        return Ok(StatusCode::ACCEPTED);
    };

    if let Some(sender) = state.clients.get(&session.id) {
        let event = Event::default().event("message").data(response.to_string());
        if sender.try_send(Ok(event)).is_err() {
            tracing::warn!(session = %session.id, "SSE client channel full or closed, dropping client");
            drop(sender);
            state.clients.remove(&session.id);
        }
    }

    Ok(StatusCode::ACCEPTED)
}

//! Streamable HTTP transport: a single `/mcp` route handling POST (one
//! JSON-RPC response per call) and GET (an SSE fallback stream), modeled on
//! the MCP 2025-06-18 Streamable HTTP transport.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::TransportError;
use super::{RequestHandler, Transport, TransportInfo, TransportKind};
use crate::session::SessionStore;

const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";
const SESSION_ID_HEADER: &str = "mcp-session-id";
const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Streamable HTTP transport configuration
#[derive(Debug, Clone)]
pub struct StreamableHttpConfig {
    /// Port to listen on
    pub port: u16,
    /// Allowed `Origin` header values; empty means no restriction
    pub allowed_origins: Vec<String>,
}

impl StreamableHttpConfig {
    /// Create a new config listening on `port` with no origin restriction
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
    allowed_origins: Vec<String>,
}

/// Streamable HTTP transport for MCP communication
pub struct StreamableHttpTransport {
    config: StreamableHttpConfig,
    cancel: CancellationToken,
}

impl StreamableHttpTransport {
    /// Create a new streamable HTTP transport
    #[must_use]
    pub fn new(config: StreamableHttpConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> super::Result<()> {
        let state = Arc::new(AppState {
            handler,
            sessions: Arc::new(SessionStore::new()),
            allowed_origins: self.config.allowed_origins.clone(),
        });

        let app = Router::new().route("/mcp", post(handle_post).get(handle_get)).with_state(state);

        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        tracing::info!(port = self.config.port, "streamable HTTP transport listening");

        let cancel = self.cancel.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))?;

        Ok(())
    }

    fn info(&self) -> TransportInfo {
        TransportInfo {
            kind: TransportKind::StreamableHttp,
            address: Some(format!("0.0.0.0:{}", self.config.port)),
        }
    }

    async fn stop(&self) {
        self.cancel.cancel();
    }
}

fn negotiate_protocol_version(headers: &HeaderMap) -> Result<(), Response> {
    let Some(raw) = headers.get(PROTOCOL_VERSION_HEADER) else {
        // Absent is tolerated; the server's supported version is assumed.
        return Ok(());
    };
    let value = raw.to_str().map_err(|_| bad_request("MCP-Protocol-Version header must be valid UTF-8"))?;
    if value != SUPPORTED_PROTOCOL_VERSION {
        return Err(bad_request(&format!(
            "unsupported protocol version `{value}`, this server supports `{SUPPORTED_PROTOCOL_VERSION}`"
        )));
    }
    Ok(())
}

fn validate_origin(headers: &HeaderMap, allowed: &[String]) -> Result<(), Response> {
    if allowed.is_empty() {
        return Ok(());
    }
    let Some(origin) = headers.get(header::ORIGIN) else {
        return Ok(());
    };
    let origin = origin.to_str().map_err(|_| bad_request("Origin header must be valid UTF-8"))?;
    if !allowed.iter().any(|a| a == origin) {
        return Err((StatusCode::FORBIDDEN, format!("origin `{origin}` is not permitted")).into_response());
    }
    Ok(())
}

fn validate_accept_for_post(headers: &HeaderMap) -> Result<(), Response> {
    let Some(accept) = headers.get(header::ACCEPT) else {
        return Err((StatusCode::NOT_ACCEPTABLE, "Accept header is required").into_response());
    };
    let accept = accept.to_str().map_err(|_| bad_request("Accept header must be valid UTF-8"))?;
    if !accept.contains("application/json") && !accept.contains('*') {
        return Err((
            StatusCode::NOT_ACCEPTABLE,
            "Accept header must include application/json",
        )
            .into_response());
    }
    Ok(())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

async fn handle_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, Response> {
    negotiate_protocol_version(&headers)?;
    validate_origin(&headers, &state.allowed_origins)?;
    validate_accept_for_post(&headers)?;

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());
    let session = state.sessions.get_or_create(session_id);

    let Some(response) = state.handler.handle_message(&session, &body).await else {
        return Ok(StatusCode::ACCEPTED.into_response());
    };

    let mut http_response = Json(response).into_response();
    http_response
        .headers_mut()
        .insert(SESSION_ID_HEADER, session.id.to_string().parse().expect("uuid is a valid header value"));
    Ok(http_response)
}

/// The GET fallback stream is a keep-alive placeholder only: it never
/// registers a `SubscriptionSink` into the session, so `resources/subscribe`
/// on a streamable-HTTP connection always resolves to `NotImplemented`
/// (dispatch.rs looks the sink up and finds none). Wiring real server push
/// here means resolving the session for the GET request and feeding this
/// stream from the same per-session queue `handle_post` replies onto, which
/// this transport does not yet do.
async fn handle_get(State(_state): State<Arc<AppState>>, headers: HeaderMap) -> Result<impl IntoResponse, Response> {
    negotiate_protocol_version(&headers)?;

    let (_tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(1);
    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_reports_streamable_http_kind_with_bound_address() {
        let transport = StreamableHttpTransport::new(StreamableHttpConfig::new(9100));
        let info = transport.info();
        assert_eq!(info.kind, TransportKind::StreamableHttp);
        assert_eq!(info.address.as_deref(), Some("0.0.0.0:9100"));
    }

    #[test]
    fn rejects_mismatched_protocol_version() {
        let mut headers = HeaderMap::new();
        headers.insert(PROTOCOL_VERSION_HEADER, "1999-01-01".parse().unwrap());
        assert!(negotiate_protocol_version(&headers).is_err());
    }

    #[test]
    fn accepts_missing_protocol_version_header() {
        let headers = HeaderMap::new();
        assert!(negotiate_protocol_version(&headers).is_ok());
    }

    #[test]
    fn rejects_origin_outside_allow_list() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, "https://evil.example".parse().unwrap());
        let allowed = vec!["https://trusted.example".to_string()];
        assert!(validate_origin(&headers, &allowed).is_err());
    }

    #[test]
    fn empty_allow_list_permits_any_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, "https://anything.example".parse().unwrap());
        assert!(validate_origin(&headers, &[]).is_ok());
    }
}

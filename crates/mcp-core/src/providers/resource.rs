//! Resource provider contract (L5)

use async_trait::async_trait;

use super::error::ProviderError;
use super::tool::{Content, Cursor};

/// An addressable content object identified by URI
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource URI
    pub uri: String,
    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional MIME type
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A sink that a resource subscription pushes change notifications into.
///
/// Implemented by the transport layer; resource providers call [`Self::notify`]
/// whenever a subscribed URI changes, and the transport turns that into a
/// `notifications/resources/updated` push to the client.
#[async_trait]
pub trait SubscriptionSink: Send + Sync {
    /// Push a change notification for `uri`
    async fn notify(&self, uri: &str);
}

/// Provides addressable, readable (and optionally subscribable) resources
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// List available resources
    async fn list_resources(&self, cursor: Option<&str>) -> Result<(Vec<Resource>, Option<Cursor>), ProviderError>;

    /// Read the contents of a resource
    async fn read_resource(&self, uri: &str) -> Result<Vec<Content>, ProviderError>;

    /// Whether this provider supports `resources/subscribe`. The dispatcher
    /// uses this to decide whether to advertise `resources.subscribe` in the
    /// negotiated server capabilities.
    fn supports_subscribe(&self) -> bool {
        false
    }

    /// Subscribe to change notifications for `uri`. Only called when
    /// [`Self::supports_subscribe`] returns `true`.
    async fn subscribe(&self, uri: &str, sink: std::sync::Arc<dyn SubscriptionSink>) -> Result<(), ProviderError> {
        let _ = (uri, sink);
        Err(ProviderError::NotImplemented("resources/subscribe".to_string()))
    }
}

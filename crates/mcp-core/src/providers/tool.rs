//! Tool provider contract and content/result types (L5)

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::ProviderError;

/// A named, schema-described callable exposed to clients via `tools/list`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Tool name, unique within its provider
    pub name: String,
    /// Human-readable description shown to the model
    pub description: String,
    /// JSON Schema fragment describing the `arguments` object
    pub input_schema: Value,
}

/// One item of a [`ToolResult`]'s content list
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    /// Plain text
    #[serde(rename = "text")]
    Text {
        /// The text
        text: String,
    },
    /// Base64-encoded image
    #[serde(rename = "image")]
    Image {
        /// Base64-encoded bytes
        data: String,
        /// MIME type, e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Base64-encoded audio
    #[serde(rename = "audio")]
    Audio {
        /// Base64-encoded bytes
        data: String,
        /// MIME type, e.g. `audio/wav`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource, identified by URI
    #[serde(rename = "resource")]
    Resource {
        /// Resource URI
        uri: String,
        /// MIME type of the resource contents
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Textual contents, if the resource is text
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Base64-encoded contents, if the resource is binary
        #[serde(skip_serializing_if = "Option::is_none")]
        blob: Option<String>,
    },
}

impl Content {
    /// Build a text content item
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    /// Build an image content item
    #[must_use]
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// The structured reply of a `tools/call` invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// Ordered content items; `[]` when the tool produced nothing, never `null`
    pub content: Vec<Content>,

    /// Distinguishes a model-addressable tool failure from a protocol error.
    /// `Response` is still success-shaped at the JSON-RPC level.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Build a successful, single-text-item result
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(s)],
            is_error: false,
        }
    }

    /// Build a failed, single-text-item result (`isError: true`)
    #[must_use]
    pub fn error(s: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(s)],
            is_error: true,
        }
    }
}

/// Opaque pagination cursor for `tools/list`
pub type Cursor = String;

/// A registry of named, invokable tools.
///
/// Implementations own whatever backs their tools (YAML definitions, a
/// reflective dispatch table, ...); the core ships exactly one concrete
/// implementation, [`crate::shell::ShellToolProvider`].
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Synchronous name enumeration, used by the registry to detect
    /// collisions at registration time without `await`ing a provider that
    /// may not have loaded yet.
    fn tool_names(&self) -> Vec<String>;

    /// List tools, honoring an opaque pagination cursor.
    ///
    /// Implementations that don't paginate internally should ignore
    /// `cursor` and return their full set with `nextCursor: None`; the
    /// composing [`super::registry::ProviderRegistry`] handles pagination
    /// across multiple providers itself.
    async fn list_tools(&self, cursor: Option<&str>) -> Result<(Vec<Tool>, Option<Cursor>), ProviderError>;

    /// Invoke a tool by name with the given (pre-validated) arguments
    async fn call_tool(&self, name: &str, args: &Value) -> Result<ToolResult, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_text_is_not_error() {
        let result = ToolResult::text("hi");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn tool_result_error_carries_message() {
        let result = ToolResult::error("boom");
        assert!(result.is_error);
        match &result.content[0] {
            Content::Text { text } => assert_eq!(text, "boom"),
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn empty_content_list_serializes_as_array_not_null() {
        let result = ToolResult {
            content: vec![],
            is_error: false,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["content"], serde_json::json!([]));
    }
}

//! Prompt provider contract (L5)

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use super::error::ProviderError;
use super::tool::{Content, Cursor};

/// An argument a [`Prompt`] accepts when rendered
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptArgument {
    /// Argument name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether the argument must be supplied
    pub required: bool,
}

/// A named template producing chat messages from a string-to-string argument map
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Prompt name, unique within the provider
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Declared arguments
    pub arguments: Vec<PromptArgument>,
}

/// A single rendered chat message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMessage {
    /// Message role, e.g. `"user"` or `"assistant"`
    pub role: String,
    /// Message content
    pub content: Content,
}

/// Provides named prompt templates
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// List available prompts
    async fn list_prompts(&self, cursor: Option<&str>) -> Result<(Vec<Prompt>, Option<Cursor>), ProviderError>;

    /// Render a prompt given a string-to-string argument map
    async fn get_prompt(
        &self,
        name: &str,
        args: &HashMap<String, String>,
    ) -> Result<Vec<PromptMessage>, ProviderError>;
}

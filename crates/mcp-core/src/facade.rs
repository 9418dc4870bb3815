//! Embeddable facade (L8): the surface an embedder or the CLI links
//! against instead of constructing [`crate::server::McpServer`] by hand.
//!
//! ```rust,ignore
//! use mcp_core::facade::EmbeddableFacade;
//! use mcp_core::shell::{ShellProviderConfig, ShellToolProvider};
//!
//! let mut facade = EmbeddableFacade::new("my-server", env!("CARGO_PKG_VERSION"));
//! facade.register_tool_provider(ShellToolProvider::load(ShellProviderConfig::default())?)?;
//! facade.run_stdio().await?;
//! ```

use std::sync::Arc;

use crate::dispatch::{Dispatcher, ServerInfo};
use crate::providers::{PromptProvider, ProviderError, ProviderRegistry, ResourceProvider, ToolProvider};
use crate::server::McpServer;
use crate::transport::{SseConfig, SseTransport, StdioTransport, StreamableHttpConfig, StreamableHttpTransport, Transport};

/// Minimal registration + run surface over a [`ProviderRegistry`] and
/// [`McpServer`], so embedders never touch [`Dispatcher`]/[`McpServer`]
/// construction directly.
pub struct EmbeddableFacade {
    registry: ProviderRegistry,
    info: ServerInfo,
}

impl EmbeddableFacade {
    /// Start building a facade reporting `name`/`version` during `initialize`
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
        }
    }

    /// Register a tool provider
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::DuplicateToolName`] if any tool it exposes
    /// collides with one already registered.
    pub fn register_tool_provider(&mut self, provider: Arc<dyn ToolProvider>) -> Result<(), ProviderError> {
        self.registry.register_tool_provider(provider)
    }

    /// Register the (single) prompt provider
    pub fn register_prompt_provider(&mut self, provider: Arc<dyn PromptProvider>) {
        self.registry.register_prompt_provider(provider);
    }

    /// Register the (single) resource provider
    pub fn register_resource_provider(&mut self, provider: Arc<dyn ResourceProvider>) {
        self.registry.register_resource_provider(provider);
    }

    /// Run over stdio until stdin closes or the process receives
    /// SIGINT/SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns [`crate::server::ServerError`] on transport failure.
    pub async fn run_stdio(self) -> Result<(), crate::server::ServerError> {
        self.run(Arc::new(StdioTransport::new())).await
    }

    /// Run the SSE transport on `config.port` until stopped
    ///
    /// # Errors
    ///
    /// Returns [`crate::server::ServerError`] on transport failure.
    pub async fn run_sse(self, config: SseConfig) -> Result<(), crate::server::ServerError> {
        self.run(Arc::new(SseTransport::new(config))).await
    }

    /// Run the streamable-HTTP transport on `config.port` until stopped
    ///
    /// # Errors
    ///
    /// Returns [`crate::server::ServerError`] on transport failure.
    pub async fn run_streamable_http(self, config: StreamableHttpConfig) -> Result<(), crate::server::ServerError> {
        self.run(Arc::new(StreamableHttpTransport::new(config))).await
    }

    async fn run(self, transport: Arc<dyn Transport>) -> Result<(), crate::server::ServerError> {
        let dispatcher = Dispatcher::new(self.registry, self.info);
        let server = McpServer::new(dispatcher, transport);
        server.start().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_facade_has_no_capabilities_registered() {
        let facade = EmbeddableFacade::new("test", "0.0.0");
        assert!(!facade.registry.has_tools());
        assert!(!facade.registry.has_prompts());
        assert!(!facade.registry.has_resources());
    }
}

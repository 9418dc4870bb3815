//! Composes tool/prompt/resource providers into the set the dispatcher sees

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::error::ProviderError;
use super::prompt::{Prompt, PromptMessage, PromptProvider};
use super::resource::{Resource, ResourceProvider};
use super::tool::{Cursor, Tool, ToolProvider, ToolResult};

/// Tools are paginated by the registry itself (providers may return their
/// full set unpaginated); this is the page size used for the opaque numeric
/// cursor.
const TOOL_PAGE_SIZE: usize = 50;

/// Composes zero or more [`ToolProvider`]s (first-registered name wins, a
/// registration that collides with an existing name is rejected outright)
/// and at most one [`PromptProvider`] / [`ResourceProvider`].
#[derive(Default)]
pub struct ProviderRegistry {
    tool_providers: Vec<Arc<dyn ToolProvider>>,
    tool_owner: HashMap<String, usize>,
    prompts: Option<Arc<dyn PromptProvider>>,
    resources: Option<Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool provider. Rejected (with the whole provider left
    /// unregistered) if any of its tool names collide with one already
    /// owned by a previously registered provider.
    pub fn register_tool_provider(&mut self, provider: Arc<dyn ToolProvider>) -> Result<(), ProviderError> {
        let names = provider.tool_names();
        for name in &names {
            if self.tool_owner.contains_key(name) {
                return Err(ProviderError::DuplicateToolName(name.clone()));
            }
        }

        let index = self.tool_providers.len();
        for name in names {
            self.tool_owner.insert(name, index);
        }
        self.tool_providers.push(provider);
        Ok(())
    }

    /// Register the (single) prompt provider
    pub fn register_prompt_provider(&mut self, provider: Arc<dyn PromptProvider>) {
        self.prompts = Some(provider);
    }

    /// Register the (single) resource provider
    pub fn register_resource_provider(&mut self, provider: Arc<dyn ResourceProvider>) {
        self.resources = Some(provider);
    }

    /// Whether any tool provider is registered
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.tool_providers.is_empty()
    }

    /// Whether a prompt provider is registered
    #[must_use]
    pub fn has_prompts(&self) -> bool {
        self.prompts.is_some()
    }

    /// Whether a resource provider is registered
    #[must_use]
    pub fn has_resources(&self) -> bool {
        self.resources.is_some()
    }

    /// Whether the registered resource provider supports subscription
    #[must_use]
    pub fn resources_support_subscribe(&self) -> bool {
        self.resources
            .as_ref()
            .is_some_and(|r| r.supports_subscribe())
    }

    /// List tools across all registered providers, paginated with a stable,
    /// gap-free, duplicate-free cursor over the name-sorted union.
    pub async fn list_tools(&self, cursor: Option<&str>) -> Result<(Vec<Tool>, Option<Cursor>), ProviderError> {
        let mut all = Vec::new();
        for provider in &self.tool_providers {
            let (tools, _) = provider.list_tools(None).await?;
            all.extend(tools);
        }
        all.sort_by(|a, b| a.name.cmp(&b.name));

        let offset: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| ProviderError::Internal(format!("invalid cursor: {c}")))?,
            None => 0,
        };

        let page: Vec<Tool> = all.iter().skip(offset).take(TOOL_PAGE_SIZE).cloned().collect();
        let next = if offset + page.len() < all.len() {
            Some((offset + page.len()).to_string())
        } else {
            None
        };

        Ok((page, next))
    }

    /// Call a tool by name, routing to whichever provider owns it
    pub async fn call_tool(&self, name: &str, args: &Value) -> Result<ToolResult, ProviderError> {
        let index = self
            .tool_owner
            .get(name)
            .copied()
            .ok_or_else(|| ProviderError::ToolNotFound(name.to_string()))?;
        self.tool_providers[index].call_tool(name, args).await
    }

    /// List prompts from the registered prompt provider, if any
    pub async fn list_prompts(&self, cursor: Option<&str>) -> Result<(Vec<Prompt>, Option<Cursor>), ProviderError> {
        match &self.prompts {
            Some(p) => p.list_prompts(cursor).await,
            None => Ok((Vec::new(), None)),
        }
    }

    /// Render a prompt from the registered prompt provider
    pub async fn get_prompt(
        &self,
        name: &str,
        args: &HashMap<String, String>,
    ) -> Result<Vec<PromptMessage>, ProviderError> {
        match &self.prompts {
            Some(p) => p.get_prompt(name, args).await,
            None => Err(ProviderError::PromptNotFound(name.to_string())),
        }
    }

    /// List resources from the registered resource provider, if any
    pub async fn list_resources(&self, cursor: Option<&str>) -> Result<(Vec<Resource>, Option<Cursor>), ProviderError> {
        match &self.resources {
            Some(r) => r.list_resources(cursor).await,
            None => Ok((Vec::new(), None)),
        }
    }

    /// Read a resource from the registered resource provider
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<super::tool::Content>, ProviderError> {
        match &self.resources {
            Some(r) => r.read_resource(uri).await,
            None => Err(ProviderError::ResourceNotFound(uri.to_string())),
        }
    }

    /// Subscribe to a resource
    pub async fn subscribe_resource(
        &self,
        uri: &str,
        sink: Arc<dyn super::resource::SubscriptionSink>,
    ) -> Result<(), ProviderError> {
        match &self.resources {
            Some(r) if r.supports_subscribe() => r.subscribe(uri, sink).await,
            Some(_) => Err(ProviderError::NotImplemented("resources/subscribe".to_string())),
            None => Err(ProviderError::ResourceNotFound(uri.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubTools {
        names: Vec<&'static str>,
    }

    #[async_trait]
    impl ToolProvider for StubTools {
        fn tool_names(&self) -> Vec<String> {
            self.names.iter().map(|s| (*s).to_string()).collect()
        }

        async fn list_tools(&self, _cursor: Option<&str>) -> Result<(Vec<Tool>, Option<Cursor>), ProviderError> {
            let tools = self
                .names
                .iter()
                .map(|n| Tool {
                    name: (*n).to_string(),
                    description: String::new(),
                    input_schema: serde_json::json!({"type": "object"}),
                })
                .collect();
            Ok((tools, None))
        }

        async fn call_tool(&self, name: &str, _args: &Value) -> Result<ToolResult, ProviderError> {
            Ok(ToolResult::text(format!("called {name}")))
        }
    }

    #[tokio::test]
    async fn duplicate_tool_name_is_rejected_at_registration() {
        let mut registry = ProviderRegistry::new();
        registry
            .register_tool_provider(Arc::new(StubTools { names: vec!["echo"] }))
            .unwrap();

        let result = registry.register_tool_provider(Arc::new(StubTools { names: vec!["echo"] }));
        assert!(matches!(result, Err(ProviderError::DuplicateToolName(_))));

        // first registration still owns the name
        let (tools, _) = registry.list_tools(None).await.unwrap();
        assert_eq!(tools.len(), 1);
    }

    #[tokio::test]
    async fn empty_tool_list_is_empty_vec_not_error() {
        let registry = ProviderRegistry::new();
        let (tools, cursor) = registry.list_tools(None).await.unwrap();
        assert!(tools.is_empty());
        assert!(cursor.is_none());
    }

    #[tokio::test]
    async fn pagination_partitions_with_no_gaps_or_duplicates() {
        let mut registry = ProviderRegistry::new();
        let names: Vec<&'static str> = vec![
            "a", "b", "c", "d", "e", "f", "g", "h", "i", "j",
        ];
        registry
            .register_tool_provider(Arc::new(StubTools { names }))
            .unwrap();

        let mut seen = std::collections::HashSet::new();
        let mut cursor = None;
        loop {
            let (page, next) = registry.list_tools(cursor.as_deref()).await.unwrap();
            for tool in &page {
                assert!(seen.insert(tool.name.clone()), "duplicate tool in pagination");
            }
            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test]
    async fn call_routes_to_owning_provider() {
        let mut registry = ProviderRegistry::new();
        registry
            .register_tool_provider(Arc::new(StubTools { names: vec!["echo"] }))
            .unwrap();

        let result = registry.call_tool("echo", &Value::Null).await.unwrap();
        match &result.content[0] {
            super::super::tool::Content::Text { text } => assert_eq!(text, "called echo"),
            _ => panic!("expected text"),
        }

        let missing = registry.call_tool("missing", &Value::Null).await;
        assert!(matches!(missing, Err(ProviderError::ToolNotFound(_))));
    }
}

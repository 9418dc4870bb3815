//! Provider-level error types

use thiserror::Error;

/// Errors raised by tool/prompt/resource providers
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Arguments failed schema validation or type coercion
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Named tool does not exist (or is capability-gated off)
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Named prompt does not exist
    #[error("prompt not found: {0}")]
    PromptNotFound(String),

    /// Named resource does not exist
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The provider recognizes the request but doesn't implement it
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Registering a provider failed because of a name collision
    #[error("duplicate tool name at registration: {0}")]
    DuplicateToolName(String),

    /// Anything else a provider implementation wants to surface as internal
    #[error("provider error: {0}")]
    Internal(String),
}

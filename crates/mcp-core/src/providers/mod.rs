//! Tool / Prompt / Resource provider contracts and composition (L5)

mod error;
mod prompt;
mod registry;
mod resource;
mod tool;

pub use error::ProviderError;
pub use prompt::{Prompt, PromptArgument, PromptMessage, PromptProvider};
pub use registry::ProviderRegistry;
pub use resource::{Resource, ResourceProvider, SubscriptionSink};
pub use tool::{Content, Cursor, Tool, ToolProvider, ToolResult};

//! # MCP Core
//!
//! A host-side [Model Context Protocol](https://modelcontextprotocol.io)
//! runtime: a transport-agnostic JSON-RPC 2.0 dispatcher, the `initialize`
//! capability handshake, a concurrent session store, a tool/prompt/resource
//! provider registry, and a pluggable shell-command tool backend that
//! exposes YAML-declared processes as MCP tools.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use mcp_core::facade::EmbeddableFacade;
//! use mcp_core::shell::{ShellProviderConfig, ShellToolProvider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut facade = EmbeddableFacade::new("my-mcp-server", env!("CARGO_PKG_VERSION"));
//!
//!     let tools = ShellToolProvider::load(ShellProviderConfig {
//!         tool_dir: "tools".into(),
//!         ..Default::default()
//!     })?;
//!     facade.register_tool_provider(tools)?;
//!
//!     facade.run_stdio().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## SSE transport example
//!
//! ```rust,ignore
//! use mcp_core::facade::EmbeddableFacade;
//! use mcp_core::transport::SseConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let facade = EmbeddableFacade::new("my-mcp-server", env!("CARGO_PKG_VERSION"));
//!     facade.run_sse(SseConfig::new(3000)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module structure
//!
//! - [`protocol`]: JSON-RPC 2.0 wire types and framing (L1)
//! - [`transport`]: stdio/SSE/streamable-HTTP transports (L2)
//! - [`dispatch`]: request routing and the `initialize` handshake (L3)
//! - [`session`]: per-connection session store (L4)
//! - [`providers`]: tool/prompt/resource provider contracts (L5)
//! - [`shell`]: the YAML-declared shell-command tool backend (L6)
//! - [`server`]: ties one transport to one dispatcher (L7)
//! - [`facade`]: the minimal embedder-facing surface (L8)

pub mod dispatch;
pub mod facade;
pub mod protocol;
pub mod providers;
pub mod server;
pub mod session;
pub mod shell;
pub mod transport;

pub use dispatch::{Dispatcher, ServerInfo};
pub use facade::EmbeddableFacade;
pub use server::{McpServer, ServerError};

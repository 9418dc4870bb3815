//! MCP Core CLI
//!
//! Command-line interface for running an MCP server backed by a directory
//! of YAML shell-tool definitions.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcp_core::facade::EmbeddableFacade;
use mcp_core::shell::{ShellProviderConfig, ShellToolProvider};
use mcp_core::transport::{SseConfig, StreamableHttpConfig};
use tracing_subscriber::EnvFilter;

/// MCP Core - a host-side Model Context Protocol runtime
#[derive(Parser, Debug)]
#[command(name = "mcp-core")]
#[command(version)]
#[command(about = "Run an MCP server over a directory of shell-command tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server
    Start(StartArgs),
    /// List the tools a tool directory would expose, without starting a server
    ListTools {
        /// Directories to load `*.yaml`/`*.yml` tool definitions from
        #[arg(long = "tool-dir", value_name = "PATH")]
        tool_dirs: Vec<PathBuf>,
    },
    /// Invoke a single tool directly and print its result
    TestTool {
        /// Tool name to invoke
        name: String,
        /// Directories to load tool definitions from
        #[arg(long = "tool-dir", value_name = "PATH")]
        tool_dirs: Vec<PathBuf>,
        /// `key=value` argument, repeatable
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },
}

#[derive(Parser, Debug)]
struct StartArgs {
    /// Which transport to serve
    #[arg(long, value_name = "TRANSPORT", default_value = "stdio")]
    transport: TransportChoice,

    /// Port to listen on; required for sse/streamable-http
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Optional path to a config file (reserved; unused today)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Named profile within the config file (reserved; unused today)
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Directories to load `*.yaml`/`*.yml` tool definitions from, repeatable
    #[arg(long = "tool-dir", value_name = "PATH")]
    tool_dirs: Vec<PathBuf>,

    /// Directory to write per-call JSON trace dumps to
    #[arg(long, value_name = "PATH")]
    trace_dir: Option<PathBuf>,

    /// Grace period (seconds) between SIGTERM and SIGKILL for a cancelled tool
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    shutdown_grace: u64,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum TransportChoice {
    Stdio,
    Sse,
    StreamableHttp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Start(args) => start(args).await,
        Command::ListTools { tool_dirs } => list_tools(&tool_dirs),
        Command::TestTool { name, tool_dirs, args } => test_tool(&name, &tool_dirs, &args).await,
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}

fn load_shell_provider(
    tool_dirs: &[PathBuf],
    trace_dir: Option<PathBuf>,
    shutdown_grace: u64,
) -> Result<std::sync::Arc<ShellToolProvider>> {
    let tool_dir = tool_dirs.first().cloned().unwrap_or_else(|| PathBuf::from("tools"));

    ShellToolProvider::load(ShellProviderConfig {
        tool_dir,
        trace_dir,
        grace_period: std::time::Duration::from_secs(shutdown_grace),
        max_stdout_bytes: 10 * 1024 * 1024,
    })
    .context("failed to load shell tool definitions")
}

async fn start(args: StartArgs) -> Result<()> {
    init_tracing(&args.log_level);
    if args.config.is_some() || args.profile.is_some() {
        tracing::warn!("--config/--profile are reserved for future use and currently ignored");
    }

    let provider = load_shell_provider(&args.tool_dirs, args.trace_dir.clone(), args.shutdown_grace)?;
    provider.spawn_watch();

    let mut facade = EmbeddableFacade::new("mcp-core", env!("CARGO_PKG_VERSION"));
    facade.register_tool_provider(provider).context("tool name collision at startup")?;

    match args.transport {
        TransportChoice::Stdio => facade.run_stdio().await?,
        TransportChoice::Sse => {
            let port = args.port.context("--port is required for the sse transport")?;
            facade.run_sse(SseConfig::new(port)).await?;
        }
        TransportChoice::StreamableHttp => {
            let port = args.port.context("--port is required for the streamable-http transport")?;
            facade.run_streamable_http(StreamableHttpConfig::new(port)).await?;
        }
    }

    Ok(())
}

fn list_tools(tool_dirs: &[PathBuf]) -> Result<()> {
    let provider = load_shell_provider(tool_dirs, None, 5)?;
    for name in provider.tool_names() {
        println!("{name}");
    }
    Ok(())
}

async fn test_tool(name: &str, tool_dirs: &[PathBuf], raw_args: &[String]) -> Result<()> {
    let provider = load_shell_provider(tool_dirs, None, 5)?;

    let mut object = serde_json::Map::new();
    for raw in raw_args {
        let (key, value) = raw.split_once('=').with_context(|| format!("`--arg {raw}` is not `key=value`"))?;
        object.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    let result = provider.call_tool(name, &serde_json::Value::Object(object)).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.is_error {
        std::process::exit(1);
    }
    Ok(())
}

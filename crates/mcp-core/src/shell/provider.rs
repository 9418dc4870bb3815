//! The shell-command [`ToolProvider`] backend (§4.7)
//!
//! Composes [`super::loader`], [`super::params`], [`super::template`],
//! [`super::exec`], and (optionally) [`super::trace`]/[`super::watch`] into
//! one provider that exposes a directory of YAML tool definitions as MCP
//! tools.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::providers::{Content, Cursor, ProviderError, Tool, ToolProvider, ToolResult};

use super::exec::{self, DEFAULT_GRACE_PERIOD};
use super::loader::{self, ShellToolDef};
use super::params;
use super::template;
use super::watch::{ToolChange, ToolWatcher};

/// Tunables for a [`ShellToolProvider`], independent of any one tool's YAML
#[derive(Debug, Clone)]
pub struct ShellProviderConfig {
    /// Directory holding `*.yaml`/`*.yml` tool definitions
    pub tool_dir: PathBuf,
    /// Directory to write per-call trace dumps to; `None` disables tracing
    pub trace_dir: Option<PathBuf>,
    /// Grace period between SIGTERM and SIGKILL on cancellation
    pub grace_period: Duration,
    /// Per-stream byte cap before stdout/stderr are truncated
    pub max_stdout_bytes: usize,
}

impl Default for ShellProviderConfig {
    fn default() -> Self {
        Self {
            tool_dir: PathBuf::from("tools"),
            trace_dir: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            max_stdout_bytes: 10 * 1024 * 1024,
        }
    }
}

/// A [`ToolProvider`] backed by a directory of YAML shell-tool definitions,
/// optionally hot-reloaded as the directory changes on disk.
pub struct ShellToolProvider {
    config: ShellProviderConfig,
    tools: DashMap<String, ShellToolDef>,
    cancel: CancellationToken,
}

impl ShellToolProvider {
    /// Load every tool definition under `config.tool_dir`.
    ///
    /// # Errors
    ///
    /// Returns the first [`super::error::ShellError`] a malformed
    /// definition or unreadable directory produces.
    pub fn load(config: ShellProviderConfig) -> Result<Arc<Self>, super::error::ShellError> {
        let defs = loader::load_dir(&config.tool_dir)?;
        let tools = DashMap::new();
        for def in defs {
            tools.insert(def.name.clone(), def);
        }
        Ok(Arc::new(Self {
            config,
            tools,
            cancel: CancellationToken::new(),
        }))
    }

    /// Spawn a background task that watches `config.tool_dir` and applies
    /// add/modify/remove changes to the live tool set. Returns immediately;
    /// the watch stops when `self` is dropped and its clone count reaches
    /// zero, or when [`Self::stop_watch`] is called.
    pub fn spawn_watch(self: &Arc<Self>) {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut watcher = match ToolWatcher::start(&provider.config.tool_dir) {
                Ok(w) => w,
                Err(e) => {
                    warn!(error = %e, "failed to start shell tool directory watch");
                    return;
                }
            };
            loop {
                tokio::select! {
                    () = provider.cancel.cancelled() => break,
                    change = watcher.recv() => {
                        let Some(change) = change else { break };
                        provider.apply_change(change);
                    }
                }
            }
        });
    }

    /// Stop the background watch task started by [`Self::spawn_watch`]
    pub fn stop_watch(&self) {
        self.cancel.cancel();
    }

    fn apply_change(&self, change: ToolChange) {
        match change {
            ToolChange::Upserted(path) => match loader::load_file(&path) {
                Ok(def) => {
                    info!(tool = %def.name, path = %path.display(), "reloaded shell tool");
                    self.tools.insert(def.name.clone(), def);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to reload shell tool, keeping previous definition"),
            },
            ToolChange::Removed(path) => {
                let removed = self.tools.iter().find(|entry| entry.source_path == path).map(|entry| entry.key().clone());
                if let Some(name) = removed {
                    info!(tool = %name, "removed shell tool");
                    self.tools.remove(&name);
                }
            }
        }
    }

    fn render_call(
        def: &ShellToolDef,
        args: &Value,
    ) -> Result<(Vec<String>, HashMap<String, String>, Option<String>), ProviderError> {
        let mut coerced = HashMap::new();
        for param in &def.parameters {
            let value = args.get(&param.name);
            let arg = params::coerce(param, value).map_err(|e| ProviderError::InvalidParams(e.to_string()))?;
            coerced.insert(param.name.clone(), arg);
        }

        let passthrough: HashMap<String, String> = std::env::vars().collect();

        let mut argv = Vec::new();
        match def.execution() {
            loader::Execution::Command(parts) => {
                for part in parts {
                    argv.push(template::render(&part, &coerced, &passthrough).map_err(|e| ProviderError::Internal(e.to_string()))?);
                }
            }
            loader::Execution::ShellScript(script) => {
                let rendered = template::render(&script, &coerced, &passthrough).map_err(|e| ProviderError::Internal(e.to_string()))?;
                argv.push(rendered);
            }
        }

        let mut env = HashMap::new();
        for (key, template_str) in &def.environment {
            let rendered = template::render(template_str, &coerced, &passthrough).map_err(|e| ProviderError::Internal(e.to_string()))?;
            env.insert(key.clone(), rendered);
        }

        let cwd = def
            .cwd
            .as_ref()
            .map(|c| template::render(c, &coerced, &passthrough).map_err(|e| ProviderError::Internal(e.to_string())))
            .transpose()?;

        Ok((argv, env, cwd))
    }
}

#[async_trait]
impl ToolProvider for ShellToolProvider {
    fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn list_tools(&self, _cursor: Option<&str>) -> Result<(Vec<Tool>, Option<Cursor>), ProviderError> {
        let tools = self
            .tools
            .iter()
            .map(|entry| {
                let def = entry.value();
                Tool {
                    name: def.name.clone(),
                    description: def.long.clone(),
                    input_schema: def.input_schema(),
                }
            })
            .collect();
        Ok((tools, None))
    }

    async fn call_tool(&self, name: &str, args: &Value) -> Result<ToolResult, ProviderError> {
        let def = self
            .tools
            .get(name)
            .ok_or_else(|| ProviderError::ToolNotFound(name.to_string()))?
            .clone();

        let (argv, env, cwd) = Self::render_call(&def, args)?;

        let execution = match def.execution() {
            loader::Execution::ShellScript(_) => loader::Execution::ShellScript(argv[0].clone()),
            loader::Execution::Command(_) => loader::Execution::Command(argv.clone()),
        };

        let call_cancel = CancellationToken::new();
        let guard = if let Some(seconds) = def.timeout_seconds {
            let call_cancel = call_cancel.clone();
            Some(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(seconds)).await;
                call_cancel.cancel();
            }))
        } else {
            None
        };

        let output = exec::run(&execution, &env, cwd.as_deref(), call_cancel, self.config.grace_period, self.config.max_stdout_bytes)
            .await
            .map_err(|e| ProviderError::Internal(e.to_string()))?;

        if let Some(guard) = guard {
            guard.abort();
        }

        if let Some(trace_dir) = &self.config.trace_dir {
            let ts = super::trace::timestamp(chrono::Utc::now());
            if let Err(e) = super::trace::write_input(trace_dir, name, &ts, &argv, &env, cwd.as_deref()) {
                warn!(tool = name, error = %e, "failed to write trace input dump");
            }
            if let Err(e) = super::trace::write_output(trace_dir, name, &ts, &output) {
                warn!(tool = name, error = %e, "failed to write trace output dump");
            }
        }

        let mut text = output.stdout;
        if def.capture_stderr && !output.stderr.is_empty() {
            text.push_str("\n--- stderr ---\n");
            text.push_str(&output.stderr);
        }
        if def.forward_stderr && !output.stderr.is_empty() {
            eprint!("{}", output.stderr);
        }

        let is_error = output.exit_code != Some(0);
        Ok(ToolResult { content: vec![Content::text(text)], is_error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tool(dir: &Path, file_name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(file_name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn lists_and_calls_a_loaded_tool() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(dir.path(), "echo.yaml", "name: echo\nshort: echoes\ncommand: [\"echo\", \"hi\"]\n");

        let provider = ShellToolProvider::load(ShellProviderConfig {
            tool_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let (tools, cursor) = provider.list_tools(None).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert!(cursor.is_none());

        let result = provider.call_tool("echo", &Value::Null).await.unwrap();
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ShellToolProvider::load(ShellProviderConfig {
            tool_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let result = provider.call_tool("missing", &Value::Null).await;
        assert!(matches!(result, Err(ProviderError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn nonzero_exit_marks_result_as_error() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(dir.path(), "boom.yaml", "name: boom\nshell-script: |\n  exit 1\n");
        let provider = ShellToolProvider::load(ShellProviderConfig {
            tool_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let result = provider.call_tool("boom", &Value::Null).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn missing_required_argument_is_invalid_params() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(
            dir.path(),
            "needs_arg.yaml",
            "name: needs_arg\ncommand: [\"echo\", \"{{ Args.message }}\"]\nparameters:\n  - name: message\n    type: string\n    required: true\n",
        );
        let provider = ShellToolProvider::load(ShellProviderConfig {
            tool_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let result = provider.call_tool("needs_arg", &Value::Null).await;
        assert!(matches!(result, Err(ProviderError::InvalidParams(_))));
    }
}

//! YAML loading of shell-tool definitions (§4.7)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::ShellError;
use super::params::ParamDef;

/// How a tool's process is invoked: an argv vector, or an inline script run
/// through a shell.
#[derive(Debug, Clone)]
pub enum Execution {
    /// Direct argv, e.g. `["git", "status"]`
    Command(Vec<String>),
    /// An inline script, run via `sh -c`
    ShellScript(String),
}

/// A YAML-declared shell tool definition
#[derive(Debug, Clone, Deserialize)]
pub struct ShellToolDef {
    /// Tool name, exposed as the MCP tool name
    pub name: String,
    /// One-line description
    #[serde(default)]
    pub short: String,
    /// Longer description; falls back to `short` if empty
    #[serde(default)]
    pub long: String,
    /// Declared parameters
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    /// How to execute the tool. Exactly one of `command`/`shell-script`
    /// is expected in the YAML; see [`Self::from_yaml`].
    #[serde(flatten)]
    pub execution: ExecutionField,
    /// Extra environment variables, templated
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Working directory, templated
    #[serde(default)]
    pub cwd: Option<String>,
    /// Whether to capture stderr into the tool result alongside stdout
    #[serde(default, rename = "capture-stderr")]
    pub capture_stderr: bool,
    /// Whether to forward the child's stderr to the server's own stderr
    #[serde(default, rename = "forward-stderr")]
    pub forward_stderr: bool,
    /// Optional per-call timeout in seconds, before the process group is killed
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Absolute path this definition was loaded from; not part of the YAML
    #[serde(skip)]
    pub source_path: PathBuf,
}

/// Raw execution fields as they appear in YAML, before being normalized into
/// an [`Execution`].
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionField {
    /// `command: [argv...]`
    pub command: Option<Vec<String>>,
    /// `shell-script: |`
    #[serde(rename = "shell-script")]
    pub shell_script: Option<String>,
}

impl ShellToolDef {
    /// Parse one YAML document into a tool definition
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Definition`] for malformed YAML, or
    /// [`ShellError::InvalidArgument`] when neither `command` nor
    /// `shell-script` is declared.
    pub fn from_yaml(source: &str, path: &Path) -> Result<Self, ShellError> {
        let mut def: Self = serde_yaml::from_str(source).map_err(|e| ShellError::Definition {
            path: path.display().to_string(),
            source: e,
        })?;
        def.source_path = path.to_path_buf();

        if def.execution.command.is_none() && def.execution.shell_script.is_none() {
            return Err(ShellError::InvalidArgument {
                name: def.name.clone(),
                reason: "tool must declare either `command` or `shell-script`".to_string(),
            });
        }
        if def.long.is_empty() {
            def.long = def.short.clone();
        }
        Ok(def)
    }

    /// The normalized execution mode
    #[must_use]
    pub fn execution(&self) -> Execution {
        if let Some(script) = &self.execution.shell_script {
            Execution::ShellScript(script.clone())
        } else {
            Execution::Command(self.execution.command.clone().unwrap_or_default())
        }
    }

    /// Build the JSON Schema `inputSchema` for this tool from its parameters
    #[must_use]
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(param.name.clone(), param.schema_property());
            if param.required {
                required.push(param.name.clone());
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Load every `*.yaml`/`*.yml` file directly under `dir` (non-recursive) as
/// a tool definition.
///
/// # Errors
///
/// Returns [`ShellError::Io`] if the directory can't be read, or any
/// per-file [`ShellError::Definition`]/[`ShellError::InvalidArgument`] the
/// first malformed file produces.
pub fn load_dir(dir: &Path) -> Result<Vec<ShellToolDef>, ShellError> {
    let mut defs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !is_yaml {
            continue;
        }
        defs.push(load_file(&path)?);
    }
    Ok(defs)
}

/// Load a single tool definition file
///
/// # Errors
///
/// See [`ShellToolDef::from_yaml`].
pub fn load_file(path: &Path) -> Result<ShellToolDef, ShellError> {
    let contents = std::fs::read_to_string(path)?;
    ShellToolDef::from_yaml(&contents, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_command_tool() {
        let yaml = "name: echo\nshort: echoes input\ncommand: [\"echo\", \"hi\"]\n";
        let def = ShellToolDef::from_yaml(yaml, &PathBuf::from("echo.yaml")).unwrap();
        assert_eq!(def.name, "echo");
        assert!(matches!(def.execution(), Execution::Command(_)));
    }

    #[test]
    fn parses_shell_script_tool() {
        let yaml = "name: boom\nshell-script: |\n  echo boom 1>&2; exit 3\n";
        let def = ShellToolDef::from_yaml(yaml, &PathBuf::from("boom.yaml")).unwrap();
        assert!(matches!(def.execution(), Execution::ShellScript(_)));
    }

    #[test]
    fn missing_execution_mode_is_rejected() {
        let yaml = "name: nothing\n";
        let result = ShellToolDef::from_yaml(yaml, &PathBuf::from("nothing.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn long_falls_back_to_short() {
        let yaml = "name: t\nshort: short desc\ncommand: [\"true\"]\n";
        let def = ShellToolDef::from_yaml(yaml, &PathBuf::from("t.yaml")).unwrap();
        assert_eq!(def.long, "short desc");
    }

    #[test]
    fn input_schema_lists_required_params() {
        let yaml = r#"
name: echo
command: ["echo"]
parameters:
  - name: message
    type: string
    required: true
"#;
        let def = ShellToolDef::from_yaml(yaml, &PathBuf::from("echo.yaml")).unwrap();
        let schema = def.input_schema();
        assert_eq!(schema["required"], serde_json::json!(["message"]));
    }
}

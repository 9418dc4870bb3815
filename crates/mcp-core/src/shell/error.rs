//! Shell-tool backend error types

use thiserror::Error;

/// Errors raised while loading, coercing arguments for, or running a
/// YAML-declared shell tool
#[derive(Debug, Error)]
pub enum ShellError {
    /// The YAML definition itself was malformed
    #[error("failed to parse tool definition {path}: {source}")]
    Definition {
        /// Path to the offending YAML file
        path: String,
        /// Underlying parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// A required argument was missing, or present but the wrong shape
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Offending parameter name
        name: String,
        /// Human-readable reason
        reason: String,
    },

    /// Template rendering of argv/env/script failed
    #[error("template render failed: {0}")]
    Template(String),

    /// Spawning or waiting on the child process failed
    #[error("process error: {0}")]
    Process(String),

    /// No tool by that name is registered
    #[error("unknown shell tool: {0}")]
    NotFound(String),

    /// I/O error reading a tool directory or writing a trace file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

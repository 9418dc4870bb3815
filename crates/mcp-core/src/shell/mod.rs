//! The shell-command tool backend (§4.7): YAML-declared tools backed by
//! spawned processes.
//!
//! ```text
//! loader  -> parses *.yaml into ShellToolDef
//! params  -> coerces tools/call arguments against declared ParamDef types
//! template -> renders argv/env/cwd/script strings through minijinja
//! exec    -> spawns the process group, captures output, honors cancellation
//! trace   -> optional per-call JSON dumps
//! watch   -> optional hot-reload of the tool directory
//! provider -> ties the above into a ToolProvider
//! ```

mod error;
mod exec;
mod loader;
mod params;
mod provider;
mod template;
mod trace;
mod watch;

pub use error::ShellError;
pub use loader::{Execution, ShellToolDef};
pub use params::{CoercedArg, ParamDef, ParamType};
pub use provider::{ShellProviderConfig, ShellToolProvider};

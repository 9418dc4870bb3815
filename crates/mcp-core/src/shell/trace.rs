//! Per-call tracing dumps for shell tools (§4.7 step 6, §8 test tooling)
//!
//! When a trace directory is configured, every invocation writes two JSON
//! files: `<tool>-<timestamp>-in.json` (rendered argv/env/cwd) and
//! `<tool>-<timestamp>-out.json` (stdout/stderr/exit code).

use std::path::Path;

use serde::Serialize;

use super::error::ShellError;
use super::exec::ExecOutput;

#[derive(Serialize)]
struct TraceInput<'a> {
    tool: &'a str,
    argv: &'a [String],
    env: &'a std::collections::HashMap<String, String>,
    cwd: Option<&'a str>,
}

#[derive(Serialize)]
struct TraceOutput<'a> {
    tool: &'a str,
    stdout: &'a str,
    stderr: &'a str,
    exit_code: Option<i32>,
}

/// Write the pre-execution trace dump for one call.
///
/// # Errors
///
/// Returns [`ShellError::Io`] if the trace directory can't be written to.
pub fn write_input(
    trace_dir: &Path,
    tool: &str,
    timestamp: &str,
    argv: &[String],
    env: &std::collections::HashMap<String, String>,
    cwd: Option<&str>,
) -> Result<(), ShellError> {
    let payload = TraceInput { tool, argv, env, cwd };
    write_json(trace_dir, &format!("{tool}-{timestamp}-in.json"), &payload)
}

/// Write the post-execution trace dump for one call.
///
/// # Errors
///
/// Returns [`ShellError::Io`] if the trace directory can't be written to.
pub fn write_output(trace_dir: &Path, tool: &str, timestamp: &str, output: &ExecOutput) -> Result<(), ShellError> {
    let payload = TraceOutput {
        tool,
        stdout: &output.stdout,
        stderr: &output.stderr,
        exit_code: output.exit_code,
    };
    write_json(trace_dir, &format!("{tool}-{timestamp}-out.json"), &payload)
}

fn write_json<T: Serialize>(trace_dir: &Path, file_name: &str, payload: &T) -> Result<(), ShellError> {
    std::fs::create_dir_all(trace_dir)?;
    let body = serde_json::to_vec_pretty(payload).map_err(|e| ShellError::Process(e.to_string()))?;
    std::fs::write(trace_dir.join(file_name), body)?;
    Ok(())
}

/// Build a filesystem-safe timestamp suitable for trace file names.
#[must_use]
pub fn timestamp(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y%m%dT%H%M%S%.fZ").to_string()
}

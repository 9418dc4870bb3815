//! Process execution for shell tools (§4.7 steps 3-5, §5 backpressure)

use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::error::ShellError;
use super::loader::Execution;

/// Output captured from a finished (or killed) process
pub struct ExecOutput {
    /// Captured stdout, truncated at `max_bytes` with a marker appended
    pub stdout: String,
    /// Captured stderr, same truncation policy
    pub stderr: String,
    /// Process exit code; `None` if the process was killed
    pub exit_code: Option<i32>,
}

/// Default grace period between signalling the process group and killing it
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Spawn and run one shell-tool invocation to completion (or cancellation).
///
/// The child is placed in its own process group via
/// [`std::os::unix::process::CommandExt::process_group`] so cancellation can
/// signal the whole group, not just the immediate child, without `unsafe`.
///
/// # Errors
///
/// Returns [`ShellError::Process`] if the process can't be spawned or
/// waited on.
pub async fn run(
    execution: &Execution,
    env: &std::collections::HashMap<String, String>,
    cwd: Option<&str>,
    cancel: CancellationToken,
    grace_period: Duration,
    max_stdout_bytes: usize,
) -> Result<ExecOutput, ShellError> {
    let mut command = match execution {
        Execution::Command(argv) => {
            let Some((program, rest)) = argv.split_first() else {
                return Err(ShellError::Process("empty command argv".to_string()));
            };
            let mut cmd = Command::new(program);
            cmd.args(rest);
            cmd
        }
        Execution::ShellScript(script) => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(script);
            cmd
        }
    };

    command.envs(env);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.stdin(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|e| ShellError::Process(e.to_string()))?;
    let pid = child.id().map(|id| Pid::from_raw(id as i32));

    let mut stdout_pipe = child.stdout.take().expect("stdout piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr piped");

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf).await;
        buf
    });

    let wait_result = tokio::select! {
        status = child.wait() => Ok(status),
        () = cancel.cancelled() => Err(()),
    };

    let exit_code = match wait_result {
        Ok(Ok(status)) => status.code(),
        Ok(Err(e)) => return Err(ShellError::Process(e.to_string())),
        Err(()) => {
            terminate(pid, &mut child, grace_period).await;
            None
        }
    };

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    Ok(ExecOutput {
        stdout: truncate(&stdout_bytes, max_stdout_bytes),
        stderr: truncate(&stderr_bytes, max_stdout_bytes),
        exit_code,
    })
}

async fn terminate(pid: Option<Pid>, child: &mut tokio::process::Child, grace_period: Duration) {
    if let Some(pid) = pid {
        // Negative pid signals the whole process group.
        let _ = signal::kill(Pid::from_raw(-pid.as_raw()), Signal::SIGTERM);
    }

    if timeout(grace_period, child.wait()).await.is_err() {
        if let Some(pid) = pid {
            let _ = signal::kill(Pid::from_raw(-pid.as_raw()), Signal::SIGKILL);
        }
        let _ = child.kill().await;
    }
}

fn truncate(bytes: &[u8], max_bytes: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= max_bytes {
        return text.into_owned();
    }
    // `max_bytes` may land inside a multi-byte char; back off to the last
    // char boundary at or before it so the slice never panics.
    let cut = text
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    let mut truncated = text[..cut].to_string();
    truncated.push_str(&format!("\n[... truncated {} bytes ...]", text.len() - cut));
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn runs_a_command_and_captures_stdout() {
        let execution = Execution::Command(vec!["echo".to_string(), "hi".to_string()]);
        let output = run(&execution, &HashMap::new(), None, CancellationToken::new(), DEFAULT_GRACE_PERIOD, 1 << 20)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hi");
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_erred() {
        let execution = Execution::ShellScript("echo boom 1>&2; exit 3".to_string());
        let output = run(&execution, &HashMap::new(), None, CancellationToken::new(), DEFAULT_GRACE_PERIOD, 1 << 20)
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(output.stderr.contains("boom"));
    }

    #[tokio::test]
    async fn cancellation_kills_the_process() {
        let execution = Execution::ShellScript("sleep 30".to_string());
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });

        let output = run(&execution, &HashMap::new(), None, cancel, Duration::from_millis(200), 1 << 20)
            .await
            .unwrap();
        assert_eq!(output.exit_code, None);
    }

    #[test]
    fn truncates_with_marker() {
        let bytes = vec![b'a'; 100];
        let text = truncate(&bytes, 10);
        assert!(text.starts_with("aaaaaaaaaa"));
        assert!(text.contains("truncated 90 bytes"));
    }

    #[test]
    fn truncation_backs_off_to_a_char_boundary() {
        // Each '€' is 3 bytes; a cutoff of 10 lands mid-character and must
        // not panic, instead backing off to the preceding boundary.
        let bytes = "€€€€".as_bytes().to_vec();
        let text = truncate(&bytes, 10);
        assert!(text.starts_with("€€€"));
        assert!(text.contains("truncated"));
    }
}

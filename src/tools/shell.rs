//! Shell execution capability.
//!
//! Runs one shell-interpreted command line from the user's home directory,
//! capturing stdout and stderr separately. Completion before the deadline
//! is a success regardless of exit code; hitting the deadline kills the
//! whole process group and reports a timeout failure.
//!
//! There is no allow-list or escaping here: any command the service user
//! may run, this tool will run.

use super::schema::{ParamSpec, ParamType};
use super::traits::Tool;
use crate::error::DispatchError;
use crate::types::{Parameters, ToolResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

pub const SHELL_TOOL_ID: &str = "shell";

/// Stateless shell capability; each call owns its child process.
#[derive(Debug, Clone)]
pub struct ShellTool {
    home: PathBuf,
    default_timeout_secs: u64,
    max_timeout_secs: u64,
}

impl ShellTool {
    /// Create the tool pinned to the current user's home directory.
    pub fn new(default_timeout_secs: u64, max_timeout_secs: u64) -> Result<Self> {
        let home = directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .context("Could not determine the user's home directory")?;

        Ok(Self {
            home,
            default_timeout_secs,
            max_timeout_secs: max_timeout_secs.max(default_timeout_secs),
        })
    }

    /// The pinned working directory.
    pub fn working_dir(&self) -> &Path {
        &self.home
    }

    fn resolve_timeout(&self, params: &Parameters) -> std::result::Result<u64, String> {
        let requested = match params.get("timeout") {
            None | Some(serde_json::Value::Null) => return Ok(self.default_timeout_secs),
            Some(v) => v.as_i64().unwrap_or(i64::MAX),
        };
        if requested <= 0 {
            return Err("'timeout' parameter must be a positive number of seconds".into());
        }
        let requested = requested as u64;
        if requested > self.max_timeout_secs {
            warn!(
                "Requested timeout {}s exceeds maximum {}s, clamping",
                requested, self.max_timeout_secs
            );
            return Ok(self.max_timeout_secs);
        }
        Ok(requested)
    }

    async fn run(&self, command: &str, timeout_secs: u64) -> Result<ToolResult> {
        let mut cmd = shell_command(command);
        cmd.current_dir(&self.home)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(ToolResult::failure(
                    SHELL_TOOL_ID,
                    format!("failed to start shell: {}", e),
                ))
            }
        };
        let pid = child.id();
        let mut stdout = child.stdout.take().context("child stdout was not captured")?;
        let mut stderr = child.stderr.take().context("child stderr was not captured")?;

        let collect = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
            )?;
            Ok::<_, std::io::Error>((status, out, err))
        };

        let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), collect).await;
        match outcome {
            Ok(Ok((status, out, err))) => Ok(completed(status, out, err)),
            Ok(Err(e)) => Ok(ToolResult::failure(
                SHELL_TOOL_ID,
                format!("failed to collect command output: {}", e),
            )),
            Err(_) => {
                warn!("Command timed out after {}s: {}", timeout_secs, command);
                terminate(&mut child, pid).await;
                Ok(DispatchError::CapabilityTimeout {
                    tool_id: SHELL_TOOL_ID.into(),
                    secs: timeout_secs,
                }
                .into_result())
            }
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        SHELL_TOOL_ID
    }

    fn description(&self) -> &str {
        "Execute a single shell command line in the user's home directory and \
         return its stdout, stderr and exit code."
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("command", ParamType::String, "The shell command to execute"),
            ParamSpec::optional(
                "timeout",
                ParamType::Integer,
                "Maximum run time in seconds (default 30)",
            ),
        ]
    }

    async fn invoke(&self, params: Parameters) -> Result<ToolResult> {
        let command = params
            .get("command")
            .and_then(|v| v.as_str())
            .context("Missing 'command' argument")?;

        if command.trim().is_empty() {
            return Ok(ToolResult::failure(SHELL_TOOL_ID, "command must not be blank"));
        }

        let timeout_secs = match self.resolve_timeout(&params) {
            Ok(secs) => secs,
            Err(msg) => return Ok(ToolResult::failure(SHELL_TOOL_ID, msg)),
        };

        info!("Running shell command (timeout {}s): {}", timeout_secs, command);
        let result = self.run(command, timeout_secs).await?;
        debug!("Shell result: {}", result);
        Ok(result)
    }
}

fn shell_command(line: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", line]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

fn completed(status: ExitStatus, out: Vec<u8>, err: Vec<u8>) -> ToolResult {
    let stdout = String::from_utf8_lossy(&out).into_owned();
    let stderr = String::from_utf8_lossy(&err).into_owned();

    match status.code() {
        Some(code) => ToolResult::success(SHELL_TOOL_ID, stdout, stderr, code),
        None => ToolResult::failure(SHELL_TOOL_ID, describe_abnormal_exit(status)),
    }
}

#[cfg(unix)]
fn describe_abnormal_exit(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(sig) => format!("command terminated by signal {}", sig),
        None => format!("command exited abnormally: {}", status),
    }
}

#[cfg(not(unix))]
fn describe_abnormal_exit(status: ExitStatus) -> String {
    format!("command exited abnormally: {}", status)
}

/// Kill the child and everything it spawned, then reap it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // SAFETY: plain syscall; the negative pid addresses the process
        // group created at spawn, which only contains this command's tree.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(
                "killpg({}) failed: {}",
                pid,
                std::io::Error::last_os_error()
            );
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.kill().await {
        debug!("Child already gone after timeout: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool() -> ShellTool {
        ShellTool::new(30, 300).unwrap()
    }

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn echo_captures_stdout() {
        let result = tool().invoke(params(json!({"command": "echo hi"}))).await.unwrap();
        assert_eq!(result, ToolResult::success("shell", "hi\n", "", 0));
    }

    #[tokio::test]
    async fn nonzero_exit_is_still_success() {
        let result = tool().invoke(params(json!({"command": "exit 7"}))).await.unwrap();
        match result {
            ToolResult::Success { return_code, .. } => assert_eq!(return_code, 7),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stderr_is_captured_separately() {
        let result = tool()
            .invoke(params(json!({"command": "echo out; echo err 1>&2"})))
            .await
            .unwrap();
        assert_eq!(result, ToolResult::success("shell", "out\n", "err\n", 0));
    }

    #[tokio::test]
    async fn runs_in_home_directory() {
        let tool = tool();
        let result = tool.invoke(params(json!({"command": "pwd -P"}))).await.unwrap();
        let expected = std::fs::canonicalize(tool.working_dir()).unwrap();
        match result {
            ToolResult::Success { stdout, .. } => {
                assert_eq!(stdout.trim_end(), expected.to_string_lossy());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn timeout_fails_and_kills_the_process_tree() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        let command = format!("sleep 2 && touch '{}'", marker.display());

        let started = std::time::Instant::now();
        let result = tool()
            .invoke(params(json!({"command": command, "timeout": 1})))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        match result {
            ToolResult::Failure {
                error_message,
                tool_id,
            } => {
                assert_eq!(tool_id, "shell");
                assert!(error_message.contains("timeout"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists(), "timed-out command kept running");
    }

    #[tokio::test]
    async fn sleep_exceeding_timeout_reports_timeout() {
        let result = tool()
            .invoke(params(json!({"command": "sleep 5", "timeout": 1})))
            .await
            .unwrap();
        match result {
            ToolResult::Failure { error_message, .. } => assert!(error_message.contains("timeout")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_positive_timeout_is_rejected() {
        let result = tool()
            .invoke(params(json!({"command": "echo hi", "timeout": 0})))
            .await
            .unwrap();
        assert_eq!(
            result,
            ToolResult::failure(
                "shell",
                "'timeout' parameter must be a positive number of seconds"
            )
        );
        // Only a command that actually ran out of time reports "timeout:".
        match result {
            ToolResult::Failure { error_message, .. } => {
                assert!(!error_message.starts_with("timeout"))
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn oversized_timeout_is_clamped() {
        let tool = ShellTool::new(30, 60).unwrap();
        assert_eq!(tool.resolve_timeout(&params(json!({"timeout": 600}))), Ok(60));
        assert_eq!(tool.resolve_timeout(&Parameters::new()), Ok(30));
    }

    #[tokio::test]
    async fn killed_by_signal_is_failure() {
        let result = tool()
            .invoke(params(json!({"command": "kill -9 $$"})))
            .await
            .unwrap();
        match result {
            ToolResult::Failure {
                error_message,
                tool_id,
            } => {
                assert_eq!(tool_id, "shell");
                assert!(error_message.contains("signal"), "{}", error_message);
                assert!(error_message.ends_with('9'), "{}", error_message);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_command_fails() {
        let result = tool().invoke(params(json!({"command": "   "}))).await.unwrap();
        assert!(!result.is_success());
    }
}

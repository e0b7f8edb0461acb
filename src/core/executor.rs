/// External command execution
///
/// Every docker, mongo and firewall call goes through here. Commands are
/// argument vectors, so values such as passwords or client-supplied
/// addresses never pass through a shell. Failures of any kind come back as
/// an `OperationResult` with `success = false`; nothing is raised past
/// this boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::shell_quote;

const SUCCESS_MESSAGE: &str = "Command executed successfully.";
const REDACTED: &str = "****";

/// Uniform outcome of one external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub output: String,
    pub error: String,
}

impl OperationResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
        }
    }

    /// Prefix the diagnostic of a failed result with the step that produced it
    pub fn for_step(mut self, step: &str) -> Self {
        if !self.success {
            self.error = if self.error.is_empty() {
                format!("{} failed", step)
            } else {
                format!("{} failed: {}", step, self.error.trim_end())
            };
        }
        self
    }
}

/// Where the child's stdout goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Not returned; a generic success message is reported instead
    Discard,
    Capture,
    /// Written to a host file, e.g. a dump archive
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub output: OutputMode,
    secrets: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            output: OutputMode::Discard,
            secrets: Vec::new(),
        }
    }

    /// A real shell pipeline. Every interpolated value must go through
    /// `shell_arg` (or `shell_quote`) first.
    ///
    /// No console operation uses this today; they all build argv directly.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Quote one value for a `shell` script. Unused by console operations.
    pub fn shell_arg(value: &str) -> String {
        shell_quote(value)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn capture(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    pub fn stdout_to(mut self, path: impl AsRef<Path>) -> Self {
        self.output = OutputMode::File(path.as_ref().to_path_buf());
        self
    }

    /// Mark a value that must never appear in logs
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Command line for logs, secrets masked
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                self.secrets
                    .iter()
                    .fold(part.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Seam between orchestration and process spawning
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: ExternalCommand) -> OperationResult;
}

/// Spawns real child processes, one per call, bounded by a timeout
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Duration,
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, command: &ExternalCommand) -> OperationResult {
        debug!(command = %command.display(), "running external command");

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        match &command.output {
            OutputMode::File(path) => match std::fs::File::create(path) {
                Ok(file) => {
                    cmd.stdout(Stdio::from(file));
                }
                Err(e) => {
                    return OperationResult::failure(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    ));
                }
            },
            OutputMode::Discard | OutputMode::Capture => {
                cmd.stdout(Stdio::piped());
            }
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %command.program, error = %e, "failed to start command");
                return OperationResult::failure(format!(
                    "Failed to execute {}: {}",
                    command.program, e
                ));
            }
        };

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return OperationResult::failure(format!(
                    "Failed to wait for {}: {}",
                    command.program, e
                ));
            }
            Err(_) => {
                warn!(command = %command.display(), timeout = ?self.timeout, "command timed out");
                return OperationResult::failure(format!(
                    "{} timed out after {}",
                    command.program,
                    humantime::format_duration(self.timeout)
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            let stdout = match command.output {
                OutputMode::Capture => stdout,
                OutputMode::Discard | OutputMode::File(_) => SUCCESS_MESSAGE.to_string(),
            };
            return OperationResult {
                success: true,
                output: stdout,
                error: stderr,
            };
        }

        warn!(command = %command.display(), status = %output.status, "command failed");

        let error = if stderr.trim().is_empty() {
            format!("{} exited with {}", command.program, output.status)
        } else {
            stderr
        };

        OperationResult {
            success: false,
            output: stdout,
            error,
        }
    }
}

#[async_trait]
impl CommandRunner for Executor {
    async fn run(&self, command: ExternalCommand) -> OperationResult {
        self.execute(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> Executor {
        Executor::new(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_captured_success() {
        let result = executor()
            .execute(&ExternalCommand::new("echo").arg("hello").capture())
            .await;
        assert!(result.success);
        assert_eq!(result.output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_uncaptured_success_reports_generic_message() {
        let result = executor().execute(&ExternalCommand::new("true")).await;
        assert!(result.success);
        assert_eq!(result.output, SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let cmd = ExternalCommand::shell("echo partial; echo boom >&2; exit 3").capture();
        let result = executor().execute(&cmd).await;
        assert!(!result.success);
        assert_eq!(result.output.trim(), "partial");
        assert_eq!(result.error.trim(), "boom");
    }

    #[tokio::test]
    async fn test_silent_failure_still_has_diagnostic() {
        let result = executor().execute(&ExternalCommand::new("false")).await;
        assert!(!result.success);
        assert!(result.error.contains("exited with"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let result = executor()
            .execute(&ExternalCommand::new("definitely-not-a-real-binary-7f3a"))
            .await;
        assert!(!result.success);
        assert!(result.error.contains("Failed to execute"));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let executor = Executor::new(Duration::from_millis(200));
        let result = executor.execute(&ExternalCommand::new("sleep").arg("5")).await;
        assert!(!result.success);
        assert!(result.error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let result = executor()
            .execute(&ExternalCommand::new("pwd").current_dir(dir.path()).capture())
            .await;
        assert!(result.success);
        assert_eq!(std::path::PathBuf::from(result.output.trim()), expected);
    }

    #[tokio::test]
    async fn test_stdout_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dump.out");
        let result = executor()
            .execute(&ExternalCommand::new("printf").arg("archive-bytes").stdout_to(&target))
            .await;
        assert!(result.success);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "archive-bytes");
    }

    #[tokio::test]
    async fn test_shell_quoting_survives_metacharacters() {
        let hostile = "a'b; echo pwned $(id)";
        let script = format!("printf %s {}", ExternalCommand::shell_arg(hostile));
        let result = executor().execute(&ExternalCommand::shell(script).capture()).await;
        assert!(result.success);
        assert_eq!(result.output, hostile);
    }

    #[test]
    fn test_display_masks_secrets() {
        let cmd = ExternalCommand::new("mongodump")
            .arg("--username=root")
            .arg("--password=hunter2")
            .secret("hunter2");
        assert_eq!(cmd.display(), "mongodump --username=root --password=****");
    }

    #[test]
    fn test_for_step_prefixes_failures_only() {
        let failed = OperationResult::failure("no such container\n").for_step("Copy into container");
        assert_eq!(failed.error, "Copy into container failed: no such container");

        let ok = OperationResult::success("done").for_step("Copy into container");
        assert!(ok.error.is_empty());
    }
}

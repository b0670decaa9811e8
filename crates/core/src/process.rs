//! Cancellable subprocess execution.
//!
//! Every external command the engine runs (package managers, detect commands,
//! legacy install scripts, container runtimes, tools themselves) goes through
//! a [`CommandRunner`], so callers can substitute a scripted runner in tests.

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path, looked up on PATH by the OS.
    pub program: String,
    /// Arguments, passed without shell interpretation.
    pub args: Vec<String>,
    /// Working directory; inherited when `None`.
    pub current_dir: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Bytes written to the child's stdin; stdin is closed when `None`.
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    /// A command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Feed `input` to the child's stdin.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Program and arguments joined by spaces, for messages and dry runs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run `script` through the platform shell (`sh -c` / `cmd /C`).
#[must_use]
pub fn shell_command(script: &str) -> CommandSpec {
    if cfg!(windows) {
        CommandSpec::new("cmd").args(["/C", script])
    } else {
        CommandSpec::new("sh").args(["-c", script])
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Captured stdout, lossily decoded as UTF-8.
    pub stdout: String,
    /// Captured stderr, lossily decoded as UTF-8.
    pub stderr: String,
}

impl ProcessOutput {
    /// Exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }

    /// `exit code N`, or a note that a signal ended the process.
    #[must_use]
    pub fn status_string(&self) -> String {
        self.status
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"))
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`].
    pub fn into_result(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: spec.display(),
                status: self.status_string(),
                output: self.combined(),
            })
        }
    }
}

/// Runs subprocesses.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output.
    ///
    /// A non-zero exit is returned as output, not as an error. Cancelling
    /// `cancel` kills the child and yields [`Error::Cancelled`].
    async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<ProcessOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<ProcessOutput> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        debug!(command = %spec.display(), "Running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if let (Some(input), Some(mut stdin)) = (spec.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                // The child may exit without reading; a broken pipe is not our failure.
                if let Err(e) = stdin.write_all(&input).await {
                    debug!(error = %e, "Child stdin closed early");
                }
            });
        }

        // Dropping the wait future drops the child, which kills it.
        let waited = tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            output = child.wait_with_output() => output,
        };
        let output =
            waited.map_err(|e| Error::io(e, None, format!("wait for `{}`", spec.program)))?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_builder() {
        let spec = CommandSpec::new("brew")
            .arg("install")
            .args(["--formula", "jq"])
            .env("HOMEBREW_NO_AUTO_UPDATE", "1");
        assert_eq!(spec.display(), "brew install --formula jq");
        assert_eq!(spec.env.get("HOMEBREW_NO_AUTO_UPDATE").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_combined_output() {
        let out = ProcessOutput {
            status: Some(1),
            stdout: "out\n".into(),
            stderr: "err\n".into(),
        };
        assert_eq!(out.combined(), "out\nerr");
        let err = out.into_result(&CommandSpec::new("x")).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { ref output, .. } if output == "out\nerr"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let out = SystemRunner
            .run(
                &shell_command("echo hello; echo oops >&2; exit 3"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_pipes_stdin() {
        let out = SystemRunner
            .run(&CommandSpec::new("cat").stdin("piped"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "piped");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_cancellation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let result = SystemRunner.run(&shell_command("sleep 30"), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let result = SystemRunner
            .run(
                &CommandSpec::new("tooldock-definitely-missing-binary"),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }
}

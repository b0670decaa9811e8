//! The executor contract.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tooldock_core::{CancellationToken, ProcessOutput, Result};

/// One tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Tool name, resolved by the executor.
    pub tool: String,
    /// Arguments passed to the tool.
    pub args: Vec<String>,
    /// Defaults to the current directory.
    pub work_dir: Option<PathBuf>,
    /// Bytes piped to the tool's stdin.
    pub stdin: Option<Vec<u8>>,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Kills the tool when cancelled.
    pub cancel: CancellationToken,
}

impl ExecOptions {
    /// Run `tool` with no arguments in the current directory.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            ..Self::default()
        }
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
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Pipe `input` to the tool.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Use `token` for cancellation.
    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Outcome of a finished tool process.
///
/// A non-zero exit code is still a result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Name of the executor that ran the tool.
    pub executor: String,
}

impl ExecResult {
    pub(crate) fn from_output(output: ProcessOutput, executor: &str) -> Self {
        Self {
            exit_code: output.status.unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
            executor: executor.to_string(),
        }
    }

    /// Exit code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can run a tool.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Short identifier reported in [`ExecResult::executor`].
    fn name(&self) -> &'static str;

    /// Whether this executor can run `tool` right now.
    async fn is_available(&self, tool: &str) -> bool;

    /// Run the tool; fails only when the tool could not be started or
    /// the caller cancelled.
    async fn execute(&self, options: &ExecOptions) -> Result<ExecResult>;
}

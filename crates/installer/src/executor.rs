//! Running a single installer attempt.

use crate::attempt::InstallerAttempt;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tooldock_core::process::shell_command;
use tooldock_core::{
    CommandRunner, Error, InstallOptions, InstallStrategy, InstallerKind, ManagerRegistry,
    Result, SystemRunner, Tool,
};
use tooldock_tools_artifact::{ArtifactInstaller, ArtifactOptions};
use tracing::debug;

/// Result of a successful attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// The command that ran (or would have run).
    pub command: Option<String>,
    /// `false` for dry runs.
    pub executed: bool,
    /// Installed binary, when known.
    pub binary_path: Option<PathBuf>,
}

/// Executes one attempt.
#[async_trait]
pub trait AttemptExecutor: Send + Sync {
    /// Run `attempt` for `tool`.
    async fn execute(
        &self,
        tool: &Tool,
        attempt: &InstallerAttempt,
        options: &InstallOptions,
    ) -> Result<AttemptOutcome>;
}

/// Dispatches attempts to the artifact installer, a registered package
/// installer, or the platform shell.
#[derive(Clone)]
pub struct DefaultExecutor {
    registry: ManagerRegistry,
    artifacts: Option<ArtifactInstaller>,
    runner: Arc<dyn CommandRunner>,
}

impl DefaultExecutor {
    /// Executor using the system shell.
    #[must_use]
    pub fn new(registry: ManagerRegistry, artifacts: Option<ArtifactInstaller>) -> Self {
        Self {
            registry,
            artifacts,
            runner: Arc::new(SystemRunner),
        }
    }

    /// Run shell commands through `runner`.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    async fn run_artifact(
        &self,
        tool: &Tool,
        attempt: &InstallerAttempt,
        options: &InstallOptions,
    ) -> Result<AttemptOutcome> {
        let installer = self.artifacts.as_ref().ok_or_else(|| {
            Error::configuration(format!(
                "tool '{}' needs the artifact installer, which is not configured",
                tool.name
            ))
        })?;
        if options.dry_run {
            return Ok(AttemptOutcome {
                command: attempt.command.clone(),
                executed: false,
                binary_path: None,
            });
        }
        let installed = installer
            .install(
                tool,
                &ArtifactOptions {
                    version: options.version.clone(),
                    from_file: None,
                    force: options.force,
                    cancel: options.cancel.clone(),
                },
            )
            .await?;
        Ok(AttemptOutcome {
            command: attempt.command.clone(),
            executed: true,
            binary_path: Some(installed.binary_path),
        })
    }

    async fn run_shell(
        &self,
        tool: &Tool,
        script: &str,
        options: &InstallOptions,
    ) -> Result<AttemptOutcome> {
        if options.dry_run {
            return Ok(AttemptOutcome {
                command: Some(script.to_string()),
                executed: false,
                binary_path: None,
            });
        }
        let spec = shell_command(script);
        let output = self.runner.run(&spec, &options.cancel).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: script.to_string(),
                status: output.status_string(),
                output: output.combined(),
            });
        }
        let binary_path = which::which(tool.binary_name()).ok();
        debug!(tool = %tool.name, found = ?binary_path, "Shell install finished");
        Ok(AttemptOutcome {
            command: Some(script.to_string()),
            executed: true,
            binary_path,
        })
    }
}

impl std::fmt::Debug for DefaultExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultExecutor")
            .field("registry", &self.registry)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AttemptExecutor for DefaultExecutor {
    async fn execute(
        &self,
        tool: &Tool,
        attempt: &InstallerAttempt,
        options: &InstallOptions,
    ) -> Result<AttemptOutcome> {
        match (&tool.strategy, attempt.kind) {
            (InstallStrategy::Artifacts(_), InstallerKind::Artifact) => {
                self.run_artifact(tool, attempt, options).await
            }
            (InstallStrategy::PackageManager(spec), kind) => {
                let installer = self.registry.get(kind.as_str()).ok_or_else(|| {
                    Error::configuration(format!(
                        "tool '{}': no installer registered for package manager '{kind}'",
                        tool.name
                    ))
                })?;
                let outcome = installer.install(tool, spec, options).await?;
                Ok(AttemptOutcome {
                    command: Some(outcome.command),
                    executed: outcome.executed,
                    binary_path: outcome.binary_path,
                })
            }
            (InstallStrategy::Commands(_), _) => match &attempt.command {
                Some(script) => self.run_shell(tool, script, options).await,
                None => Err(Error::configuration(format!(
                    "tool '{}' has no {} install command",
                    tool.name, attempt.kind
                ))),
            },
            _ => Err(Error::configuration(format!(
                "tool '{}' cannot be installed with {}",
                tool.name, attempt.kind
            ))),
        }
    }
}

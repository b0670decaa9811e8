//! The installer strategy engine.

use crate::attempt::{
    AttemptRecord, AttemptStatus, InstallerAttempt, attempt_command, attempt_order,
};
use crate::executor::{AttemptExecutor, AttemptOutcome, DefaultExecutor};
use std::path::PathBuf;
use std::sync::Arc;
use tooldock_core::{
    Avenues, Error, InstallOptions, InstallerKind, ManagerRegistry, Platform, Remediation, Result,
    Settings, Tool,
};
use tooldock_tools_artifact::ArtifactInstaller;
use tooldock_tools_brew::BrewInstaller;
use tooldock_tools_scoop::ScoopInstaller;
use tracing::{debug, info, warn};

/// Decides whether an installer kind can run on this machine.
pub trait AvailabilityProbe: Send + Sync {
    /// `true` when an attempt of `kind` could run now.
    fn is_available(&self, kind: InstallerKind) -> bool;
}

impl<F> AvailabilityProbe for F
where
    F: Fn(InstallerKind) -> bool + Send + Sync,
{
    fn is_available(&self, kind: InstallerKind) -> bool {
        self(kind)
    }
}

/// Registered managers answer for themselves; other kinds need their
/// program on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    registry: ManagerRegistry,
}

impl SystemProbe {
    /// Checks registered managers first, then `PATH`.
    #[must_use]
    pub fn new(registry: ManagerRegistry) -> Self {
        Self { registry }
    }
}

impl AvailabilityProbe for SystemProbe {
    fn is_available(&self, kind: InstallerKind) -> bool {
        if kind.is_always_available() {
            return true;
        }
        if let Some(installer) = self.registry.get(kind.as_str()) {
            return installer.manager().is_available();
        }
        kind.program()
            .is_some_and(|program| which::which(program).is_ok())
    }
}

/// A successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Tool name.
    pub tool: String,
    /// The installer that succeeded.
    pub installer: InstallerKind,
    /// Command that ran, or would have run.
    pub command: Option<String>,
    /// `false` for dry runs.
    pub executed: bool,
    /// Installed binary, when known.
    pub binary_path: Option<PathBuf>,
    /// Every attempt up to and including the successful one.
    pub attempts: Vec<AttemptRecord>,
}

/// Registry with the built-in Homebrew and Scoop installers.
#[must_use]
pub fn default_registry() -> ManagerRegistry {
    let mut registry = ManagerRegistry::new();
    registry.register(BrewInstaller::default());
    registry.register(ScoopInstaller::default());
    registry
}

/// Tries a tool's installers in priority order until one succeeds.
#[derive(Clone)]
pub struct InstallEngine {
    platform: Platform,
    registry: ManagerRegistry,
    probe: Arc<dyn AvailabilityProbe>,
    executor: Arc<dyn AttemptExecutor>,
}

impl InstallEngine {
    /// Engine for the current platform using the system probe and default executor.
    #[must_use]
    pub fn new(registry: ManagerRegistry, artifacts: Option<ArtifactInstaller>) -> Self {
        Self {
            platform: Platform::current(),
            probe: Arc::new(SystemProbe::new(registry.clone())),
            executor: Arc::new(DefaultExecutor::new(registry.clone(), artifacts)),
            registry,
        }
    }

    /// Engine with the built-in managers and an artifact installer rooted per `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let artifacts = ArtifactInstaller::from_settings(settings)?;
        Ok(Self::new(default_registry(), Some(artifacts)))
    }

    /// Plan for `platform` instead of the running one.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the availability check.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn AvailabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the attempt executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn AttemptExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Target platform.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Ordered attempts for `tool`, each marked available or not.
    ///
    /// `manual` and `artifact` attempts are always available, whatever the probe says.
    #[must_use]
    pub fn build_installer_attempts(&self, tool: &Tool) -> Vec<InstallerAttempt> {
        attempt_order(tool, self.platform.os)
            .into_iter()
            .map(|kind| InstallerAttempt {
                kind,
                command: attempt_command(tool, kind, &self.platform),
                available: kind.is_always_available() || self.probe.is_available(kind),
            })
            .collect()
    }

    /// Install `tool`, trying attempts strictly in order.
    ///
    /// Unavailable attempts and attempts without a command are skipped.
    /// Failures are logged and the next attempt runs; configuration errors and
    /// cancellation stop immediately.
    pub async fn install_tool(&self, tool: &Tool, options: &InstallOptions) -> Result<InstallReport> {
        if !tool.supports_os(self.platform.os) {
            return Err(Error::configuration(format!(
                "tool '{}' does not support {}",
                tool.name, self.platform.os
            )));
        }

        let attempts = self.build_installer_attempts(tool);
        let mut records = Vec::with_capacity(attempts.len());

        for attempt in &attempts {
            if options.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if !attempt.available {
                debug!(tool = %tool.name, installer = %attempt.kind, "Installer not available, skipping");
                records.push(AttemptRecord {
                    kind: attempt.kind,
                    status: AttemptStatus::Unavailable,
                });
                continue;
            }
            if attempt.command.is_none() {
                debug!(tool = %tool.name, installer = %attempt.kind, "No install command, skipping");
                records.push(AttemptRecord {
                    kind: attempt.kind,
                    status: AttemptStatus::NoCommand,
                });
                continue;
            }

            info!(tool = %tool.name, installer = %attempt.kind, dry_run = options.dry_run, "Trying installer");
            match self.executor.execute(tool, attempt, options).await {
                Ok(AttemptOutcome {
                    command,
                    executed,
                    binary_path,
                }) => {
                    records.push(AttemptRecord {
                        kind: attempt.kind,
                        status: AttemptStatus::Succeeded,
                    });
                    info!(tool = %tool.name, installer = %attempt.kind, "Installed");
                    return Ok(InstallReport {
                        tool: tool.name.clone(),
                        installer: attempt.kind,
                        command,
                        executed,
                        binary_path,
                        attempts: records,
                    });
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    warn!(tool = %tool.name, installer = %attempt.kind, error = %e, "Installer failed, trying next");
                    records.push(AttemptRecord {
                        kind: attempt.kind,
                        status: AttemptStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        Err(Error::NotInstalled {
            tool: tool.name.clone(),
            tried: Avenues::new(records.iter().map(ToString::to_string).collect()),
            remediation: Remediation::new(self.instructions(tool, &attempts)),
        })
    }

    /// Install several tools one after another, collecting each result.
    pub async fn install_tools(
        &self,
        tools: &[&Tool],
        options: &InstallOptions,
    ) -> Vec<(String, Result<InstallReport>)> {
        let mut results = Vec::with_capacity(tools.len());
        for tool in tools {
            if options.cancel.is_cancelled() {
                results.push((tool.name.clone(), Err(Error::Cancelled)));
                continue;
            }
            results.push((tool.name.clone(), self.install_tool(tool, options).await));
        }
        results
    }

    /// Manual instructions: the manual script first, then each installer's
    /// command with where to get the installer.
    fn instructions(&self, tool: &Tool, attempts: &[InstallerAttempt]) -> Vec<String> {
        let mut manual = Vec::new();
        let mut others = Vec::new();
        for attempt in attempts {
            let Some(command) = &attempt.command else {
                continue;
            };
            match attempt.kind {
                InstallerKind::Manual => {
                    manual.push(format!("run the manual install script: {command}"));
                }
                InstallerKind::Artifact => others.push(format!(
                    "{command}, verify its sha256 and put '{}' on PATH",
                    tool.binary_name()
                )),
                kind => {
                    let docs = self
                        .registry
                        .get(kind.as_str())
                        .map(|i| i.manager().install_url())
                        .or_else(|| kind.docs_url());
                    others.push(match docs {
                        Some(url) => format!("install {kind} ({url}), then run: {command}"),
                        None => format!("run: {command}"),
                    });
                }
            }
        }
        manual.extend(others);
        if manual.is_empty() {
            manual.push(format!(
                "install '{}' yourself and make sure it is on PATH",
                tool.binary_name()
            ));
        }
        manual
    }
}

impl std::fmt::Debug for InstallEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallEngine")
            .field("platform", &self.platform)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

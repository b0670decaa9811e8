//! Installer attempt planning.

use std::fmt;
use tooldock_core::{InstallStrategy, InstallerKind, Os, PackageManagerInstall, Platform, Tool};

/// One candidate way of installing a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerAttempt {
    /// Installer for this attempt.
    pub kind: InstallerKind,
    /// Command to run, or a description of the action for non-shell kinds.
    pub command: Option<String>,
    /// Whether the installer exists on this machine.
    pub available: bool,
}

impl InstallerAttempt {
    /// Available and has something to run.
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.available && self.command.is_some()
    }
}

/// What happened to an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    /// The installer is not present.
    Unavailable,
    /// Nothing to run for this installer.
    NoCommand,
    /// Ran and failed with this message.
    Failed(String),
    /// Ran successfully.
    Succeeded,
}

/// An attempt and its outcome, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Installer that was tried.
    pub kind: InstallerKind,
    /// Outcome.
    pub status: AttemptStatus,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            AttemptStatus::Unavailable => write!(f, "{} (not available)", self.kind),
            AttemptStatus::NoCommand => write!(f, "{} (no command)", self.kind),
            AttemptStatus::Failed(reason) => write!(f, "{} (failed: {reason})", self.kind),
            AttemptStatus::Succeeded => write!(f, "{} (succeeded)", self.kind),
        }
    }
}

/// Installer kinds to try for `tool` on `os`, in order.
///
/// A declared `installer_priority` for the OS wins. Otherwise the strategy
/// decides: its package manager, the artifact installer, or the OS default
/// priority filtered to kinds with a command followed by the remaining
/// command kinds sorted by name.
#[must_use]
pub fn attempt_order(tool: &Tool, os: Os) -> Vec<InstallerKind> {
    if let Some(priority) = tool.priority_for(os) {
        return priority.to_vec();
    }
    match &tool.strategy {
        InstallStrategy::None => Vec::new(),
        InstallStrategy::PackageManager(spec) => {
            InstallerKind::parse(&spec.manager).map_or_else(|_| Vec::new(), |k| vec![k])
        }
        InstallStrategy::Artifacts(_) => vec![InstallerKind::Artifact],
        InstallStrategy::Commands(commands) => {
            let mut order: Vec<InstallerKind> = InstallerKind::default_priority(os)
                .iter()
                .copied()
                .filter(|kind| commands.contains_key(kind))
                .collect();
            let mut rest: Vec<InstallerKind> = commands
                .keys()
                .copied()
                .filter(|kind| !order.contains(kind))
                .collect();
            rest.sort_by_key(|kind| kind.as_str());
            order.extend(rest);
            order
        }
    }
}

/// The command an attempt of `kind` would run for `tool`.
#[must_use]
pub fn attempt_command(tool: &Tool, kind: InstallerKind, platform: &Platform) -> Option<String> {
    match &tool.strategy {
        InstallStrategy::None => None,
        InstallStrategy::Commands(commands) => commands.get(&kind).cloned(),
        InstallStrategy::PackageManager(spec) => {
            (InstallerKind::parse(&spec.manager).ok() == Some(kind)).then(|| describe(spec))
        }
        InstallStrategy::Artifacts(manifest) if kind == InstallerKind::Artifact => manifest
            .version(&manifest.default_version)
            .and_then(|v| v.for_platform(platform))
            .map(|artifact| format!("download {}", artifact.url)),
        InstallStrategy::Artifacts(_) => None,
    }
}

fn describe(spec: &PackageManagerInstall) -> String {
    std::iter::once(spec.manager.as_str())
        .chain(std::iter::once("install"))
        .chain(spec.flags.iter().map(String::as_str))
        .chain(std::iter::once(spec.package.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

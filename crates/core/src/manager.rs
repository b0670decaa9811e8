//! Package manager adapter contract.
//!
//! A [`PackageManager`] knows how to find one package manager on this
//! machine. A [`PackageInstaller`] drives that manager to install a tool
//! declared with `install: {type: package_manager, ...}`. Installers are
//! collected in a [`ManagerRegistry`] keyed by the manager identifier used in
//! catalog documents (`brew`, `scoop`).

use crate::catalog::{PackageManagerInstall, Tool};
use crate::error::{Avenues, Remediation};
use crate::paths::executable_name;
use crate::platform::Os;
use crate::process::{CommandRunner, CommandSpec};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Where a manager binary was found, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProbeTier {
    /// Well-known system-wide install location.
    System,
    /// Per-user install location.
    UserLocal,
    /// Found on `PATH`.
    Path,
}

/// A located package manager binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerLocation {
    /// Path to the manager binary.
    pub path: PathBuf,
    /// Which tier it was found in.
    pub tier: ProbeTier,
}

/// Locate `program`: the first existing `system` path, then `user`, then `PATH`.
#[must_use]
pub fn probe_tiers(system: &[PathBuf], user: &[PathBuf], program: &str) -> Option<ManagerLocation> {
    let tiered = system
        .iter()
        .map(|p| (p, ProbeTier::System))
        .chain(user.iter().map(|p| (p, ProbeTier::UserLocal)));
    for (path, tier) in tiered {
        if path.is_file() {
            return Some(ManagerLocation {
                path: path.clone(),
                tier,
            });
        }
    }
    which::which(program).ok().map(|path| ManagerLocation {
        path,
        tier: ProbeTier::Path,
    })
}

/// One package manager on this machine.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Identifier used in catalogs (`brew`, `scoop`).
    fn name(&self) -> &'static str;

    /// Where to get the manager when it is missing.
    fn install_url(&self) -> &'static str;

    /// Operating systems the manager runs on.
    fn supported_platforms(&self) -> &'static [Os];

    /// Find the manager binary.
    fn probe(&self) -> Option<ManagerLocation>;

    /// Runs on this OS and its binary was found.
    fn is_available(&self) -> bool {
        self.supported_platforms().contains(&Os::current()) && self.probe().is_some()
    }

    /// The manager's own version string.
    async fn version(&self, cancel: &CancellationToken) -> Result<String>;
}

/// Per-call install options shared by every installer.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Report the command that would run without running it.
    pub dry_run: bool,
    /// Reinstall even when already present (artifact installs).
    pub force: bool,
    /// Version override (artifact installs).
    pub version: Option<String>,
    /// Cancels running subprocesses and downloads.
    pub cancel: CancellationToken,
}

impl InstallOptions {
    /// Defaults with `dry_run` set.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

/// Result of a package manager install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInstallOutcome {
    /// The install command line.
    pub command: String,
    /// `false` for dry runs.
    pub executed: bool,
    /// Verified binary location; `None` for dry runs.
    pub binary_path: Option<PathBuf>,
}

/// Installs tools through one package manager.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// The manager this installer drives.
    fn manager(&self) -> &dyn PackageManager;

    /// Install `spec` and verify the resulting binary.
    async fn install(
        &self,
        tool: &Tool,
        spec: &PackageManagerInstall,
        options: &InstallOptions,
    ) -> Result<PackageInstallOutcome>;
}

/// Error for a manager that is not installed.
#[must_use]
pub fn manager_unavailable(manager: &dyn PackageManager) -> Error {
    Error::ManagerUnavailable {
        manager: manager.name().to_string(),
        remediation: Remediation::new(vec![format!(
            "install {} from {}",
            manager.name(),
            manager.install_url()
        )]),
    }
}

/// Whether a source listing (`brew tap`, `scoop bucket list`) names `source`.
///
/// A line matches when its first column equals `source`, ignoring case.
#[must_use]
pub fn listing_contains(listing: &str, source: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|first| first.eq_ignore_ascii_case(source))
}

/// Locate the installed binary and run the tool's detect command.
///
/// The binary (`bin_name`, else the detect binary) is looked up in
/// `destination` first, then on `PATH`. A failing detect command is only
/// logged once the binary is known to exist.
pub async fn verify_post_install(
    tool: &Tool,
    spec: &PackageManagerInstall,
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let (detect_binary, detect_args) = tool.detect_parts();
    let binary = spec.bin_name.clone().unwrap_or(detect_binary);

    let found = spec
        .destination
        .as_deref()
        .and_then(|dir| find_in_dir(dir, &binary))
        .or_else(|| which::which(&binary).ok());

    let Some(path) = found else {
        let mut tried = Vec::new();
        let mut suggestions = Vec::new();
        if let Some(dir) = &spec.destination {
            tried.push(dir.display().to_string());
            suggestions.push(format!(
                "check that {} installs '{binary}' into {}",
                spec.manager,
                dir.display()
            ));
        }
        tried.push("PATH".to_string());
        suggestions.push(format!(
            "add the {} binary directory to PATH, or set `bin_name` if the binary is not called '{binary}'",
            spec.manager
        ));
        return Err(Error::NotFound {
            tool: tool.name.clone(),
            tried: Avenues::new(tried),
            remediation: Remediation::new(suggestions),
        });
    };

    if tool.detect_command.is_some() {
        let detect = CommandSpec::new(path.to_string_lossy()).args(detect_args);
        match runner.run(&detect, cancel).await {
            Ok(output) if output.success() => {
                debug!(tool = %tool.name, path = %path.display(), "Detect command succeeded");
            }
            Ok(output) => warn!(
                tool = %tool.name,
                status = %output.status_string(),
                "Detect command failed after install; binary is present"
            ),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => warn!(
                tool = %tool.name,
                error = %e,
                "Detect command could not run after install; binary is present"
            ),
        }
    }
    Ok(path)
}

fn find_in_dir(dir: &Path, binary: &str) -> Option<PathBuf> {
    let candidate = dir.join(executable_name(binary, Os::current()));
    candidate.is_file().then_some(candidate)
}

/// Registry of package installers keyed by manager identifier.
#[derive(Default, Clone)]
pub struct ManagerRegistry {
    installers: HashMap<&'static str, Arc<dyn PackageInstaller>>,
}

impl ManagerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installer; an existing one with the same name is replaced.
    pub fn register<I: PackageInstaller + 'static>(&mut self, installer: I) {
        self.register_arc(Arc::new(installer));
    }

    /// [`Self::register`] for an installer that is already shared.
    pub fn register_arc(&mut self, installer: Arc<dyn PackageInstaller>) {
        let name = installer.manager().name();
        self.installers.insert(name, installer);
    }

    /// Installer for a manager identifier.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn PackageInstaller>> {
        self.installers.get(name)
    }

    /// Registered manager identifiers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.installers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered installers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.installers.len()
    }

    /// No installers registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installers.is_empty()
    }
}

impl std::fmt::Debug for ManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerRegistry")
            .field("installers", &self.names())
            .finish()
    }
}

//! Homebrew adapter and installer.
//!
//! Handles tools declared as:
//!
//! ```yaml
//! install:
//!   type: package_manager
//!   manager: brew
//!   tap: anchore/grype        # optional, tapped only when missing
//!   package: grype
//!   package_type: formula     # or cask
//!   flags: ["--quiet"]
//! ```

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tooldock_core::manager::{
    listing_contains, manager_unavailable, probe_tiers, verify_post_install,
};
use tooldock_core::{
    CancellationToken, CommandRunner, CommandSpec, Error, InstallOptions, ManagerLocation, Os,
    PackageInstallOutcome, PackageInstaller, PackageManager, PackageManagerInstall, PackageType,
    Result, SystemRunner, Tool,
};
use tracing::{debug, info};

/// System-wide Homebrew locations, Apple Silicon first.
const SYSTEM_PATHS: &[&str] = &[
    "/opt/homebrew/bin/brew",
    "/usr/local/bin/brew",
    "/home/linuxbrew/.linuxbrew/bin/brew",
];

/// The Homebrew package manager.
#[derive(Clone)]
pub struct Brew {
    runner: Arc<dyn CommandRunner>,
    system_paths: Vec<PathBuf>,
    user_paths: Vec<PathBuf>,
    os: Os,
}

impl Default for Brew {
    fn default() -> Self {
        Self::new()
    }
}

impl Brew {
    /// Homebrew through the system runner.
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    /// Use `runner` for every brew invocation.
    #[must_use]
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            system_paths: SYSTEM_PATHS.iter().map(PathBuf::from).collect(),
            user_paths: dirs::home_dir()
                .map(|home| vec![home.join(".linuxbrew").join("bin").join("brew")])
                .unwrap_or_default(),
            os: Os::current(),
        }
    }

    /// Treat the host as `os` when checking platform support.
    #[must_use]
    pub fn with_os(mut self, os: Os) -> Self {
        self.os = os;
        self
    }

    /// Replace the well-known probe locations.
    #[must_use]
    pub fn with_probe_paths(mut self, system: Vec<PathBuf>, user: Vec<PathBuf>) -> Self {
        self.system_paths = system;
        self.user_paths = user;
        self
    }

    /// Directory holding `brew` and the binaries it links.
    #[must_use]
    pub fn bin_dir(&self) -> Option<PathBuf> {
        self.probe()
            .and_then(|location| location.path.parent().map(PathBuf::from))
    }

    fn program(&self) -> String {
        self.probe()
            .map_or_else(|| "brew".to_string(), |l| l.path.to_string_lossy().into_owned())
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.program()).env("HOMEBREW_NO_AUTO_UPDATE", "1")
    }
}

impl std::fmt::Debug for Brew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Brew")
            .field("system_paths", &self.system_paths)
            .field("user_paths", &self.user_paths)
            .field("os", &self.os)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PackageManager for Brew {
    fn name(&self) -> &'static str {
        "brew"
    }

    fn install_url(&self) -> &'static str {
        "https://brew.sh"
    }

    fn supported_platforms(&self) -> &'static [Os] {
        &[Os::Darwin, Os::Linux]
    }

    fn probe(&self) -> Option<ManagerLocation> {
        probe_tiers(&self.system_paths, &self.user_paths, "brew")
    }

    fn is_available(&self) -> bool {
        self.supported_platforms().contains(&self.os) && self.probe().is_some()
    }

    async fn version(&self, cancel: &CancellationToken) -> Result<String> {
        let spec = self.command().arg("--version");
        let output = self.runner.run(&spec, cancel).await?.into_result(&spec)?;
        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("Homebrew")
            .trim()
            .to_string())
    }
}

/// `install [--formula|--cask] <flags...> <package>`
#[must_use]
pub fn install_args(spec: &PackageManagerInstall) -> Vec<String> {
    let mut args = vec!["install".to_string()];
    args.push(
        match spec.package_type() {
            PackageType::Formula => "--formula",
            PackageType::Cask => "--cask",
        }
        .to_string(),
    );
    args.extend(spec.flags.iter().cloned());
    args.push(spec.package.clone());
    args
}

/// Installs tools with Homebrew.
#[derive(Debug, Clone, Default)]
pub struct BrewInstaller {
    brew: Brew,
}

impl BrewInstaller {
    /// Installer driving `brew`.
    #[must_use]
    pub fn new(brew: Brew) -> Self {
        Self { brew }
    }

    /// Tap `tap` unless `brew tap` already lists it.
    async fn ensure_tap(&self, tap: &str, cancel: &CancellationToken) -> Result<()> {
        let list = self.brew.command().arg("tap");
        let output = self.brew.runner.run(&list, cancel).await?.into_result(&list)?;
        if listing_contains(&output.stdout, tap) {
            debug!(%tap, "Tap already registered");
            return Ok(());
        }
        info!(%tap, "Adding Homebrew tap");
        let add = self.brew.command().args(["tap", tap]);
        self.brew.runner.run(&add, cancel).await?.into_result(&add)?;
        Ok(())
    }
}

#[async_trait]
impl PackageInstaller for BrewInstaller {
    fn manager(&self) -> &dyn PackageManager {
        &self.brew
    }

    async fn install(
        &self,
        tool: &Tool,
        spec: &PackageManagerInstall,
        options: &InstallOptions,
    ) -> Result<PackageInstallOutcome> {
        if !self.brew.is_available() {
            return Err(manager_unavailable(&self.brew));
        }

        let install = self.brew.command().args(install_args(spec));
        let command_line = std::iter::once("brew".to_string())
            .chain(install.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        if options.dry_run {
            debug!(tool = %tool.name, tap = ?spec.tap, "Dry run, skipping tap and install");
            return Ok(PackageInstallOutcome {
                command: command_line,
                executed: false,
                binary_path: None,
            });
        }

        if let Some(tap) = &spec.tap {
            self.ensure_tap(tap, &options.cancel).await?;
        }

        info!(tool = %tool.name, command = %command_line, "Installing with Homebrew");
        let output = self.brew.runner.run(&install, &options.cancel).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command_line,
                status: output.status_string(),
                output: output.combined(),
            });
        }

        let binary_path =
            verify_post_install(tool, spec, self.brew.runner.as_ref(), &options.cancel).await?;
        Ok(PackageInstallOutcome {
            command: command_line,
            executed: true,
            binary_path: Some(binary_path),
        })
    }
}

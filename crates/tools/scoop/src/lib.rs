//! Scoop adapter and installer.
//!
//! Scoop has no formula/cask distinction, so `package_type` is ignored, and
//! sources are buckets rather than taps:
//!
//! ```yaml
//! install:
//!   type: package_manager
//!   manager: scoop
//!   bucket: extras
//!   package: extras/gitleaks
//! ```

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tooldock_core::manager::{
    listing_contains, manager_unavailable, probe_tiers, verify_post_install,
};
use tooldock_core::{
    CancellationToken, CommandRunner, CommandSpec, Error, InstallOptions, ManagerLocation, Os,
    PackageInstallOutcome, PackageInstaller, PackageManager, PackageManagerInstall, Result,
    SystemRunner, Tool,
};
use tracing::{debug, info};

const SHIM: &str = "scoop.cmd";

/// The Scoop package manager.
#[derive(Clone)]
pub struct Scoop {
    runner: Arc<dyn CommandRunner>,
    system_paths: Vec<PathBuf>,
    user_paths: Vec<PathBuf>,
    os: Os,
}

impl Default for Scoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scoop {
    /// Scoop through the system runner.
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    /// Scoop through `runner`.
    #[must_use]
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            system_paths: vec![PathBuf::from(r"C:\ProgramData\scoop\shims").join(SHIM)],
            user_paths: user_shims_dir().map(|d| vec![d.join(SHIM)]).unwrap_or_default(),
            os: Os::current(),
        }
    }

    /// Replace the well-known probe locations.
    #[must_use]
    pub fn with_probe_paths(mut self, system: Vec<PathBuf>, user: Vec<PathBuf>) -> Self {
        self.system_paths = system;
        self.user_paths = user;
        self
    }

    /// Treat the host as `os` when checking platform support.
    #[must_use]
    pub fn with_os(mut self, os: Os) -> Self {
        self.os = os;
        self
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(
            self.probe()
                .map_or_else(|| "scoop".to_string(), |l| l.path.to_string_lossy().into_owned()),
        )
    }
}

/// `$SCOOP\shims`, else `%USERPROFILE%\scoop\shims`.
#[must_use]
pub fn user_shims_dir() -> Option<PathBuf> {
    if let Ok(root) = std::env::var("SCOOP")
        && !root.is_empty()
    {
        return Some(PathBuf::from(root).join("shims"));
    }
    dirs::home_dir().map(|home| home.join("scoop").join("shims"))
}

impl std::fmt::Debug for Scoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scoop")
            .field("system_paths", &self.system_paths)
            .field("user_paths", &self.user_paths)
            .field("os", &self.os)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PackageManager for Scoop {
    fn name(&self) -> &'static str {
        "scoop"
    }

    fn install_url(&self) -> &'static str {
        "https://scoop.sh"
    }

    fn supported_platforms(&self) -> &'static [Os] {
        &[Os::Windows]
    }

    fn probe(&self) -> Option<ManagerLocation> {
        probe_tiers(&self.system_paths, &self.user_paths, "scoop")
    }

    fn is_available(&self) -> bool {
        self.supported_platforms().contains(&self.os) && self.probe().is_some()
    }

    async fn version(&self, cancel: &CancellationToken) -> Result<String> {
        let spec = self.command().arg("--version");
        let output = self.runner.run(&spec, cancel).await?.into_result(&spec)?;
        Ok(parse_version(&output.stdout))
    }
}

/// Pick the `vX.Y.Z` token out of `scoop --version` output.
fn parse_version(stdout: &str) -> String {
    stdout
        .split_whitespace()
        .find(|token| {
            token
                .strip_prefix('v')
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        })
        .map_or_else(
            || stdout.lines().next().unwrap_or_default().trim().to_string(),
            |token| token.trim_start_matches('v').to_string(),
        )
}

/// `install <flags...> <package>`
#[must_use]
pub fn install_args(spec: &PackageManagerInstall) -> Vec<String> {
    let mut args = vec!["install".to_string()];
    args.extend(spec.flags.iter().cloned());
    args.push(spec.package.clone());
    args
}

/// Installs tools with Scoop.
#[derive(Debug, Clone, Default)]
pub struct ScoopInstaller {
    scoop: Scoop,
}

impl ScoopInstaller {
    /// Installer driving `scoop`.
    #[must_use]
    pub fn new(scoop: Scoop) -> Self {
        Self { scoop }
    }

    /// Add `bucket` unless `scoop bucket list` already shows it.
    async fn ensure_bucket(&self, bucket: &str, cancel: &CancellationToken) -> Result<()> {
        let list = self.scoop.command().args(["bucket", "list"]);
        let output = self.scoop.runner.run(&list, cancel).await?.into_result(&list)?;
        if listing_contains(&output.stdout, bucket) {
            debug!(%bucket, "Bucket already added");
            return Ok(());
        }
        info!(%bucket, "Adding Scoop bucket");
        let add = self.scoop.command().args(["bucket", "add", bucket]);
        self.scoop.runner.run(&add, cancel).await?.into_result(&add)?;
        Ok(())
    }
}

#[async_trait]
impl PackageInstaller for ScoopInstaller {
    fn manager(&self) -> &dyn PackageManager {
        &self.scoop
    }

    async fn install(
        &self,
        tool: &Tool,
        spec: &PackageManagerInstall,
        options: &InstallOptions,
    ) -> Result<PackageInstallOutcome> {
        if !self.scoop.is_available() {
            return Err(manager_unavailable(&self.scoop));
        }

        let args = install_args(spec);
        let command_line = format!("scoop {}", args.join(" "));
        if options.dry_run {
            debug!(tool = %tool.name, bucket = ?spec.bucket, "Dry run, skipping bucket and install");
            return Ok(PackageInstallOutcome {
                command: command_line,
                executed: false,
                binary_path: None,
            });
        }

        if let Some(bucket) = &spec.bucket {
            self.ensure_bucket(bucket, &options.cancel).await?;
        }

        info!(tool = %tool.name, command = %command_line, "Installing with Scoop");
        let install = self.scoop.command().args(args);
        let output = self.scoop.runner.run(&install, &options.cancel).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command_line,
                status: output.status_string(),
                output: output.combined(),
            });
        }

        let binary_path =
            verify_post_install(tool, spec, self.scoop.runner.as_ref(), &options.cancel).await?;
        Ok(PackageInstallOutcome {
            command: command_line,
            executed: true,
            binary_path: Some(binary_path),
        })
    }
}

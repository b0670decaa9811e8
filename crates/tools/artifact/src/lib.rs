//! Checksum-verified release archive installer.
//!
//! Installs a tool declared with an `artifacts` manifest:
//!
//! 1. pick the version (override or `default_version`) and the artifact for
//!    the exact `{os}_{arch}` slot
//! 2. short-circuit when `<root>/bin/<tool>@<version>/<binary>` already exists
//! 3. obtain the archive: a local file, the download cache, or a fresh download
//! 4. verify its SHA-256; a cached file that fails is deleted
//! 5. extract the binary (path traversal is rejected before anything is written)
//!
//! Nothing is executable until verification and extraction have both succeeded.

mod download;
pub mod error;
mod extract;
mod verify;

pub use download::{DEFAULT_TIMEOUT, Downloader};
pub use error::ArtifactError;
pub use extract::{ArchiveKind, MemberSelector, escapes_root, extract_member};
pub use verify::{sha256_file, verify_sha256};

use std::path::{Path, PathBuf};
use std::time::Duration;
use tooldock_core::{
    Artifact, Avenues, CancellationToken, Error, Platform, Result, Settings, Tool, ToolPaths,
};
use tracing::{debug, info, warn};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ArtifactOptions {
    /// Install this version instead of the manifest default.
    pub version: Option<String>,
    /// Use a local archive instead of downloading.
    pub from_file: Option<PathBuf>,
    /// Re-verify and re-extract even when the binary is present.
    pub force: bool,
    /// Aborts the download.
    pub cancel: CancellationToken,
}

/// A completed artifact install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInstall {
    /// Extracted executable.
    pub binary_path: PathBuf,
    /// Installed version.
    pub version: String,
    /// Archive checksum matched (at install time for an existing binary).
    pub verified: bool,
}

/// Installs tools from their artifact manifests.
#[derive(Debug, Clone)]
pub struct ArtifactInstaller {
    paths: ToolPaths,
    platform: Platform,
    downloader: Downloader,
}

impl ArtifactInstaller {
    /// Installer for the current platform with the default download timeout.
    pub fn new(paths: ToolPaths) -> Result<Self> {
        Self::with_timeout(paths, DEFAULT_TIMEOUT)
    }

    /// Installer with a custom download timeout.
    pub fn with_timeout(paths: ToolPaths, timeout: Duration) -> Result<Self> {
        let downloader =
            Downloader::new(timeout).map_err(|e| Error::install("artifact", "setup", e))?;
        Ok(Self {
            paths,
            platform: Platform::current(),
            downloader,
        })
    }

    /// Root and timeout taken from [`Settings`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_timeout(settings.paths.clone(), settings.download_timeout)
    }

    /// Install for `platform` instead of the running one.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Managed layout.
    #[must_use]
    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    /// Install `tool` from its artifact manifest.
    pub async fn install(&self, tool: &Tool, options: &ArtifactOptions) -> Result<ArtifactInstall> {
        let manifest = tool.artifacts().ok_or_else(|| {
            Error::configuration(format!("tool '{}' declares no artifacts", tool.name))
        })?;

        let version = options
            .version
            .clone()
            .unwrap_or_else(|| manifest.default_version.clone());
        let artifacts = manifest
            .version(&version)
            .ok_or_else(|| Error::VersionNotFound {
                tool: tool.name.clone(),
                version: version.clone(),
                available: Avenues::new(manifest.version_names()),
            })?;
        let artifact =
            artifacts
                .for_platform(&self.platform)
                .ok_or_else(|| Error::ArtifactUnavailable {
                    tool: tool.name.clone(),
                    version: version.clone(),
                    platform: self.platform.artifact_key(),
                })?;

        let binary = tool.binary_name();
        let target = self
            .paths
            .managed_binary(&tool.name, &version, binary, self.platform.os);
        if target.is_file() && !options.force {
            debug!(tool = %tool.name, %version, path = %target.display(), "Already installed");
            return Ok(ArtifactInstall {
                binary_path: target,
                version,
                verified: true,
            });
        }

        info!(tool = %tool.name, %version, platform = %self.platform, "Installing artifact");
        let archive = self.obtain(tool, &version, artifact, options).await?;
        let from_cache = options.from_file.is_none();

        let checked = archive.clone();
        let expected = artifact.sha256.clone();
        let verdict = tokio::task::spawn_blocking(move || verify_sha256(&checked, &expected))
            .await
            .map_err(ArtifactError::from)
            .and_then(|r| r);
        if let Err(e) = verdict {
            if from_cache && matches!(e, ArtifactError::ChecksumMismatch { .. }) {
                warn!(
                    tool = %tool.name,
                    path = %archive.display(),
                    "Removing cached archive that failed verification"
                );
                if let Err(rm) = std::fs::remove_file(&archive) {
                    warn!(error = %rm, "Could not remove cached archive");
                }
            }
            return Err(wrap(&tool.name, "verify", e));
        }

        let kind = ArchiveKind::from_file_name(&archive_name(artifact, &archive));
        let selector = match &artifact.extract_path {
            Some(path) => MemberSelector::Path(path.clone()),
            None => MemberSelector::FileName(
                tooldock_core::paths::executable_name(binary, self.platform.os),
            ),
        };
        let dest = target.clone();
        tokio::task::spawn_blocking(move || extract_member(&archive, kind, &selector, &dest))
            .await
            .map_err(ArtifactError::from)
            .and_then(|r| r)
            .map_err(|e| wrap(&tool.name, "extract", e))?;

        info!(tool = %tool.name, %version, path = %target.display(), "Artifact installed");
        Ok(ArtifactInstall {
            binary_path: target,
            version,
            verified: true,
        })
    }

    /// Local file, cached download, or a fresh download into the cache.
    async fn obtain(
        &self,
        tool: &Tool,
        version: &str,
        artifact: &Artifact,
        options: &ArtifactOptions,
    ) -> Result<PathBuf> {
        if let Some(file) = &options.from_file {
            if !file.is_file() {
                return Err(Error::io(
                    std::io::Error::new(std::io::ErrorKind::NotFound, "archive not found"),
                    Some(file.clone()),
                    "read local archive",
                ));
            }
            return Ok(file.clone());
        }

        let cached = self
            .paths
            .cache_file(&tool.name, version, artifact.file_name());
        if cached.is_file() {
            debug!(tool = %tool.name, path = %cached.display(), "Using cached archive");
            return Ok(cached);
        }
        self.downloader
            .fetch(&artifact.url, &cached, &options.cancel)
            .await
            .map_err(|e| wrap(&tool.name, "download", e))?;
        Ok(cached)
    }
}

/// Name used to pick the archive format: the local file's own name, else the URL's.
fn archive_name(artifact: &Artifact, archive: &Path) -> String {
    match archive.file_name().and_then(|n| n.to_str()) {
        Some(name) if ArchiveKind::from_file_name(name) != ArchiveKind::Raw => name.to_string(),
        _ => artifact.file_name().to_string(),
    }
}

fn wrap(tool: &str, step: &str, e: ArtifactError) -> Error {
    match e {
        ArtifactError::Cancelled => Error::Cancelled,
        other => Error::install(tool, step, other),
    }
}

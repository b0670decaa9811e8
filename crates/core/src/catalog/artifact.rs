//! Artifact manifests: trusted download URLs and checksums per version and platform.

use crate::platform::{Arch, Os, Platform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One downloadable release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Download URL.
    pub url: String,
    /// Hex SHA-256 of the archive; compared case-insensitively.
    pub sha256: String,
    /// Member name inside the archive when it differs from the binary name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_path: Option<String>,
}

impl Artifact {
    /// File name component of the URL (query and fragment stripped).
    #[must_use]
    pub fn file_name(&self) -> &str {
        let without_query = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.url);
        without_query
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(without_query)
    }
}

/// Per-platform artifacts for one version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionArtifacts {
    /// macOS on Apple silicon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darwin_arm64: Option<Artifact>,
    /// macOS on Intel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darwin_amd64: Option<Artifact>,
    /// Linux on ARM64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_arm64: Option<Artifact>,
    /// Linux on x86-64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_amd64: Option<Artifact>,
    /// Windows on x86-64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_amd64: Option<Artifact>,
}

impl VersionArtifacts {
    /// Artifact for the exact `{os}_{arch}` slot of `platform`.
    #[must_use]
    pub fn for_platform(&self, platform: &Platform) -> Option<&Artifact> {
        match (platform.os, platform.arch) {
            (Os::Darwin, Arch::Arm64) => self.darwin_arm64.as_ref(),
            (Os::Darwin, Arch::X86_64) => self.darwin_amd64.as_ref(),
            (Os::Linux, Arch::Arm64) => self.linux_arm64.as_ref(),
            (Os::Linux, Arch::X86_64) => self.linux_amd64.as_ref(),
            (Os::Windows, Arch::X86_64) => self.windows_amd64.as_ref(),
            (Os::Windows, Arch::Arm64) => None,
        }
    }

    /// Every declared artifact with its slot key.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Artifact)> {
        [
            ("darwin_arm64", self.darwin_arm64.as_ref()),
            ("darwin_amd64", self.darwin_amd64.as_ref()),
            ("linux_arm64", self.linux_arm64.as_ref()),
            ("linux_amd64", self.linux_amd64.as_ref()),
            ("windows_amd64", self.windows_amd64.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, artifact)| artifact.map(|a| (key, a)))
    }
}

/// Versioned artifact table for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Version installed when none is requested; must be a key of `versions`.
    pub default_version: String,
    /// Artifacts keyed by version.
    pub versions: BTreeMap<String, VersionArtifacts>,
}

impl ArtifactManifest {
    /// Artifacts for `version`.
    #[must_use]
    pub fn version(&self, version: &str) -> Option<&VersionArtifacts> {
        self.versions.get(version)
    }

    /// Declared version keys.
    #[must_use]
    pub fn version_names(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }
}

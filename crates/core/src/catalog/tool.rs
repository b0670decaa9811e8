//! Tool definitions.

use super::artifact::ArtifactManifest;
use crate::kind::InstallerKind;
use crate::platform::Os;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Broad classification of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// Installed through a language toolchain (cargo, go, npm, ...).
    #[serde(alias = "language_toolchain")]
    LanguageToolchain,
    /// Shipped alongside tooldock itself.
    Bundled,
    /// A regular system tool.
    #[default]
    System,
}

/// Platforms a tool applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlatformSet {
    /// Empty list, `"*"` or `"all"`.
    #[default]
    All,
    /// An explicit subset.
    Only(BTreeSet<Os>),
}

impl PlatformSet {
    /// Whether `os` is included.
    #[must_use]
    pub fn contains(&self, os: Os) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&os),
        }
    }
}

/// Package type for formula-style managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// A command-line package.
    #[default]
    Formula,
    /// An application bundle.
    Cask,
}

/// Install through a package manager adapter (`install: {type: package_manager, ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerInstall {
    /// Adapter identifier (`brew`, `scoop`).
    pub manager: String,
    /// Formula-style source repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tap: Option<String>,
    /// Bucket-style source repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Manager-specific package identifier; may carry a tap/bucket prefix.
    pub package: String,
    /// Formula or cask; formula when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_type: Option<PackageType>,
    /// Extra CLI arguments passed through verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    /// Directory checked first when verifying the installed binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Binary name when it differs from the detect command's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_name: Option<String>,
}

impl PackageManagerInstall {
    /// Effective package type (formula unless stated otherwise).
    #[must_use]
    pub fn package_type(&self) -> PackageType {
        self.package_type.unwrap_or_default()
    }
}

/// How a tool gets installed. Exactly one strategy per tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InstallStrategy {
    /// Nothing declared; the tool can only be resolved, not installed.
    #[default]
    None,
    /// Legacy shell commands keyed by installer kind.
    Commands(BTreeMap<InstallerKind, String>),
    /// A package manager adapter.
    PackageManager(PackageManagerInstall),
    /// Versioned release archives.
    Artifacts(ArtifactManifest),
}

/// A named external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// Catalog key; also the default binary name.
    pub name: String,
    /// Broad classification.
    pub kind: ToolKind,
    /// Free-form description for listings.
    pub description: Option<String>,
    /// Command used to verify presence; its first token is the binary name.
    pub detect_command: Option<String>,
    /// Platforms the tool applies to.
    pub platforms: PlatformSet,
    /// Per-OS installer ordering overriding the built-in default.
    pub installer_priority: BTreeMap<Os, Vec<InstallerKind>>,
    /// How the tool gets installed.
    pub strategy: InstallStrategy,
}

impl Tool {
    /// A tool with no install strategy, applicable everywhere.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ToolKind::default(),
            description: None,
            detect_command: None,
            platforms: PlatformSet::All,
            installer_priority: BTreeMap::new(),
            strategy: InstallStrategy::None,
        }
    }

    /// Set the detect command.
    #[must_use]
    pub fn with_detect_command(mut self, command: impl Into<String>) -> Self {
        self.detect_command = Some(command.into());
        self
    }

    /// Set the install strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: InstallStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restrict the tool to the given platforms.
    #[must_use]
    pub fn with_platforms(mut self, platforms: PlatformSet) -> Self {
        self.platforms = platforms;
        self
    }

    /// Set the installer ordering for one OS.
    #[must_use]
    pub fn with_priority(mut self, os: Os, kinds: Vec<InstallerKind>) -> Self {
        self.installer_priority.insert(os, kinds);
        self
    }

    /// Binary name: first token of the detect command, else the tool name.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        self.detect_command
            .as_deref()
            .and_then(|cmd| cmd.split_whitespace().next())
            .unwrap_or(&self.name)
    }

    /// Detect command split into binary and arguments.
    #[must_use]
    pub fn detect_parts(&self) -> (String, Vec<String>) {
        let mut parts = self
            .detect_command
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(String::from);
        let binary = parts.next().unwrap_or_else(|| self.name.clone());
        (binary, parts.collect())
    }

    /// Whether the tool applies to `os`.
    #[must_use]
    pub fn supports_os(&self, os: Os) -> bool {
        self.platforms.contains(os)
    }

    /// Installer priority declared for `os`, if any.
    #[must_use]
    pub fn priority_for(&self, os: Os) -> Option<&[InstallerKind]> {
        self.installer_priority.get(&os).map(Vec::as_slice)
    }

    /// The artifact manifest when the tool uses the artifact strategy.
    #[must_use]
    pub fn artifacts(&self) -> Option<&ArtifactManifest> {
        match &self.strategy {
            InstallStrategy::Artifacts(manifest) => Some(manifest),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_name_from_detect_command() {
        let tool = Tool::new("golangci-lint").with_detect_command("golangci-lint   version");
        assert_eq!(tool.binary_name(), "golangci-lint");

        let tool = Tool::new("syft");
        assert_eq!(tool.binary_name(), "syft");

        let tool = Tool::new("pyright").with_detect_command("   ");
        assert_eq!(tool.binary_name(), "pyright");
    }

    #[test]
    fn test_detect_parts() {
        let tool = Tool::new("trivy").with_detect_command("trivy --version");
        assert_eq!(
            tool.detect_parts(),
            ("trivy".to_string(), vec!["--version".to_string()])
        );
        assert_eq!(Tool::new("jq").detect_parts(), ("jq".to_string(), vec![]));
    }

    #[test]
    fn test_platform_set() {
        assert!(PlatformSet::All.contains(Os::Windows));
        let only = PlatformSet::Only([Os::Windows].into_iter().collect());
        assert!(only.contains(Os::Windows));
        assert!(!only.contains(Os::Linux));
    }

    #[test]
    fn test_package_type_default() {
        let spec = PackageManagerInstall {
            manager: "brew".into(),
            tap: None,
            bucket: None,
            package: "jq".into(),
            package_type: None,
            flags: vec![],
            destination: None,
            bin_name: None,
        };
        assert_eq!(spec.package_type(), PackageType::Formula);
    }
}

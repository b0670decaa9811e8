//! The tool catalog.
//!
//! A catalog document has two top-level maps:
//!
//! ```yaml
//! scopes:
//!   security:
//!     description: SBOM and vulnerability scanners
//!     tools: [syft, grype]
//! tools:
//!   syft:
//!     detect_command: syft version
//!     artifacts:
//!       default_version: "1.4.1"
//!       versions:
//!         "1.4.1":
//!           linux_amd64: { url: "https://...", sha256: "..." }
//!   jq:
//!     install:
//!       type: package_manager
//!       manager: brew
//!       package: jq
//! ```
//!
//! Documents are validated once while loading ([`Config::from_yaml_str`],
//! [`Config::from_toml_str`], [`Config::from_json_str`], [`Config::from_path`]);
//! the resulting values are
//! immutable and can be shared freely across threads.

mod artifact;
mod scope;
mod tool;
mod validate;

pub use artifact::{Artifact, ArtifactManifest, VersionArtifacts};
pub use scope::Scope;
pub use tool::{InstallStrategy, PackageManagerInstall, PackageType, PlatformSet, Tool, ToolKind};
pub use validate::{ValidationWarning, parse_platforms, validate_install_command_keys};

use crate::platform::Os;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use validate::RawTool;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    scopes: BTreeMap<String, Scope>,
    #[serde(default)]
    tools: BTreeMap<String, RawTool>,
}

/// A parsed, validated (and possibly merged) catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Scopes by name.
    pub scopes: BTreeMap<String, Scope>,
    /// Tools by name.
    pub tools: BTreeMap<String, Tool>,
    warnings: Vec<ValidationWarning>,
}

impl Config {
    /// Parse a YAML catalog.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::configuration(format!("invalid YAML catalog: {e}")))?;
        Self::from_raw(raw)
    }

    /// Parse a TOML catalog.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("invalid TOML catalog: {e}")))?;
        Self::from_raw(raw)
    }

    /// Parse a JSON catalog.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(content)
            .map_err(|e| Error::configuration(format!("invalid JSON catalog: {e}")))?;
        Self::from_raw(raw)
    }

    /// Load a catalog file; the format follows the extension (`.toml`,
    /// `.json`, else YAML).
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read catalog"))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let mut warnings = Vec::new();
        let mut tools = BTreeMap::new();
        for (name, raw_tool) in raw.tools {
            let tool = raw_tool.into_tool(&name, &mut warnings)?;
            tools.insert(name, tool);
        }
        Ok(Self {
            scopes: raw.scopes,
            tools,
            warnings,
        })
    }

    /// Non-fatal problems found while loading.
    #[must_use]
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Tools that apply to `os`, ordered by name.
    #[must_use]
    pub fn applicable_tools(&self, os: Os) -> Vec<&Tool> {
        self.tools.values().filter(|t| t.supports_os(os)).collect()
    }

    /// Tools belonging to a scope, in scope order.
    pub fn scope_tools(&self, scope: &str) -> Result<Vec<&Tool>> {
        let definition = self
            .scopes
            .get(scope)
            .ok_or_else(|| Error::configuration(format!("unknown scope '{scope}'")))?;
        definition
            .tools
            .iter()
            .map(|name| {
                self.tools.get(name).ok_or_else(|| {
                    Error::configuration(format!("scope '{scope}' references unknown tool '{name}'"))
                })
            })
            .collect()
    }

    /// Layer `overlay` on top of `self`.
    ///
    /// Overlay tools replace same-named tools; scopes merge per
    /// [`Scope::merged_with`].
    #[must_use]
    pub fn merge(mut self, overlay: Self) -> Self {
        for (name, scope) in overlay.scopes {
            let merged = match self.scopes.get(&name) {
                Some(base) => base.merged_with(&scope),
                None => scope,
            };
            self.scopes.insert(name, merged);
        }
        self.tools.extend(overlay.tools);
        self.warnings.extend(overlay.warnings);
        self
    }
}

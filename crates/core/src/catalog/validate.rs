//! Parse-time validation of catalog documents.
//!
//! Configuration documents are deserialized into permissive raw shapes and
//! then converted into [`Tool`] values exactly once. Everything ambiguous in
//! the document (which install strategy, which platforms, which installer
//! kinds) is settled here so downstream code never re-interprets it.

use super::artifact::ArtifactManifest;
use super::tool::{InstallStrategy, PackageManagerInstall, PlatformSet, Tool, ToolKind};
use crate::kind::{InstallerKind, is_platform_key};
use crate::platform::Os;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// A non-fatal problem found while loading the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Tool the warning concerns.
    pub tool: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool '{}': {}", self.tool, self.message)
    }
}

/// A single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrVec {
    String(String),
    Vec(Vec<String>),
}

impl StringOrVec {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::String(s) => vec![s],
            Self::Vec(v) => v,
        }
    }
}

/// `install:` block; discriminated by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum RawInstall {
    PackageManager(PackageManagerInstall),
}

/// Tool entry as written in a configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawTool {
    #[serde(default)]
    pub kind: ToolKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detect_command: Option<String>,
    #[serde(default)]
    pub platforms: Option<StringOrVec>,
    #[serde(default)]
    pub installer_priority: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub install_commands: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub install: Option<RawInstall>,
    #[serde(default)]
    pub artifacts: Option<ArtifactManifest>,
}

impl RawTool {
    /// Validate and convert into a [`Tool`].
    pub(crate) fn into_tool(
        self,
        name: &str,
        warnings: &mut Vec<ValidationWarning>,
    ) -> Result<Tool> {
        if self.install.is_some() && self.install_commands.is_some() {
            return Err(Error::MutuallyExclusive {
                tool: name.to_string(),
            });
        }
        if self.artifacts.is_some() && (self.install.is_some() || self.install_commands.is_some())
        {
            return Err(Error::configuration(format!(
                "tool '{name}': `artifacts` is mutually exclusive with `install` and `install_commands`"
            )));
        }

        let strategy = match (self.install, self.install_commands, self.artifacts) {
            (Some(RawInstall::PackageManager(spec)), None, None) => {
                validate_package_manager(name, &spec)?;
                InstallStrategy::PackageManager(spec)
            }
            (None, Some(commands), None) => {
                let (commands, found) = validate_install_command_keys(name, &commands)?;
                warnings.extend(found);
                InstallStrategy::Commands(commands)
            }
            (None, None, Some(manifest)) => {
                validate_manifest(name, &manifest)?;
                InstallStrategy::Artifacts(manifest)
            }
            _ => InstallStrategy::None,
        };

        if !is_path_segment(name) {
            return Err(Error::configuration(format!(
                "tool name '{name}' must not be empty or contain '/', '\\' or '..'"
            )));
        }

        Ok(Tool {
            name: name.to_string(),
            kind: self.kind,
            description: self.description,
            detect_command: self.detect_command.filter(|c| !c.trim().is_empty()),
            platforms: parse_platforms(name, self.platforms.map(StringOrVec::into_vec))?,
            installer_priority: parse_priority(name, &self.installer_priority)?,
            strategy,
        })
    }
}

/// Parse a `platforms` list.
///
/// Empty, `"*"` and `"all"` (any case, surrounding whitespace ignored) mean
/// every platform.
pub fn parse_platforms(tool: &str, entries: Option<Vec<String>>) -> Result<PlatformSet> {
    let mut set = BTreeSet::new();
    for entry in entries.unwrap_or_default() {
        let entry = entry.trim().to_lowercase();
        match entry.as_str() {
            "" => {}
            "*" | "all" => return Ok(PlatformSet::All),
            other => {
                let os = Os::parse(other).ok_or_else(|| {
                    Error::configuration(format!("tool '{tool}': unknown platform '{other}'"))
                })?;
                set.insert(os);
            }
        }
    }
    if set.is_empty() {
        Ok(PlatformSet::All)
    } else {
        Ok(PlatformSet::Only(set))
    }
}

/// Check legacy `install_commands` keys against the installer kinds.
///
/// Keys naming a platform (`linux`, `darwin`, `windows`) are a leftover of the
/// old schema: they are dropped with a warning. Any other unknown key is an
/// error.
pub fn validate_install_command_keys(
    tool: &str,
    commands: &BTreeMap<String, String>,
) -> Result<(BTreeMap<InstallerKind, String>, Vec<ValidationWarning>)> {
    let mut valid = BTreeMap::new();
    let mut warnings = Vec::new();
    for (key, command) in commands {
        if is_platform_key(key) {
            warn!(
                %tool,
                key = %key,
                "install_commands key is a platform name, expected an installer kind"
            );
            warnings.push(ValidationWarning {
                tool: tool.to_string(),
                message: format!(
                    "install_commands key '{key}' is a platform name; use an installer kind such as 'brew', 'apt' or 'manual'"
                ),
            });
            continue;
        }
        let kind = InstallerKind::parse(key)?;
        if kind == InstallerKind::Artifact {
            return Err(Error::configuration(format!(
                "tool '{tool}': install_commands cannot use the 'artifact' kind; declare `artifacts` instead"
            )));
        }
        valid.insert(kind, command.clone());
    }
    Ok((valid, warnings))
}

fn validate_package_manager(tool: &str, spec: &PackageManagerInstall) -> Result<()> {
    let manager = InstallerKind::parse(&spec.manager)?;
    if spec.package.trim().is_empty() {
        return Err(Error::configuration(format!(
            "tool '{tool}': package_manager install requires a package"
        )));
    }
    match manager {
        InstallerKind::Scoop if spec.tap.is_some() => Err(Error::configuration(format!(
            "tool '{tool}': scoop installs use `bucket`, not `tap`"
        ))),
        InstallerKind::Brew if spec.bucket.is_some() => Err(Error::configuration(format!(
            "tool '{tool}': brew installs use `tap`, not `bucket`"
        ))),
        InstallerKind::Brew | InstallerKind::Scoop => Ok(()),
        other => Err(Error::configuration(format!(
            "tool '{tool}': '{other}' has no package manager adapter; use 'brew' or 'scoop', or declare `install_commands`"
        ))),
    }
}

/// Usable as one directory name under the tools root.
fn is_path_segment(value: &str) -> bool {
    !value.trim().is_empty()
        && !value.contains(['/', '\\'])
        && value != "."
        && !value.contains("..")
}

fn validate_manifest(tool: &str, manifest: &ArtifactManifest) -> Result<()> {
    if !manifest.versions.contains_key(&manifest.default_version) {
        return Err(Error::configuration(format!(
            "tool '{tool}': default_version '{}' is not declared in artifacts",
            manifest.default_version
        )));
    }
    for (version, artifacts) in &manifest.versions {
        if !is_path_segment(version) {
            return Err(Error::configuration(format!(
                "tool '{tool}': artifact version '{version}' must not be empty or contain '/', '\\' or '..'"
            )));
        }
        for (slot, artifact) in artifacts.iter() {
            if artifact.url.trim().is_empty() {
                return Err(Error::configuration(format!(
                    "tool '{tool}' {version} {slot}: artifact url is empty"
                )));
            }
            let sha = artifact.sha256.trim();
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::configuration(format!(
                    "tool '{tool}' {version} {slot}: sha256 must be 64 hex characters"
                )));
            }
        }
    }
    Ok(())
}

fn parse_priority(
    tool: &str,
    raw: &BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<Os, Vec<InstallerKind>>> {
    let mut priority = BTreeMap::new();
    for (platform, kinds) in raw {
        let os = Os::parse(platform).ok_or_else(|| {
            Error::configuration(format!(
                "tool '{tool}': installer_priority key '{platform}' is not a platform"
            ))
        })?;
        let kinds = kinds
            .iter()
            .map(|k| InstallerKind::parse(k))
            .collect::<Result<Vec<_>>>()?;
        priority.insert(os, kinds);
    }
    Ok(priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platforms_all_variants() {
        assert_eq!(parse_platforms("t", None).unwrap(), PlatformSet::All);
        assert_eq!(
            parse_platforms("t", Some(vec![])).unwrap(),
            PlatformSet::All
        );
        assert_eq!(
            parse_platforms("t", Some(vec!["*".into()])).unwrap(),
            PlatformSet::All
        );
        assert_eq!(
            parse_platforms("t", Some(vec!["  ALL ".into()])).unwrap(),
            PlatformSet::All
        );
    }

    #[test]
    fn test_parse_platforms_subset() {
        let set = parse_platforms("t", Some(vec![" Windows".into(), "macos".into()])).unwrap();
        assert!(set.contains(Os::Windows));
        assert!(set.contains(Os::Darwin));
        assert!(!set.contains(Os::Linux));
    }

    #[test]
    fn test_parse_platforms_unknown() {
        assert!(parse_platforms("t", Some(vec!["solaris".into()])).is_err());
    }

    #[test]
    fn test_platform_keys_warn_but_do_not_fail() {
        let commands: BTreeMap<String, String> = [
            ("linux".to_string(), "curl | sh".to_string()),
            ("brew".to_string(), "brew install jq".to_string()),
        ]
        .into_iter()
        .collect();
        let (valid, warnings) = validate_install_command_keys("jq", &commands).unwrap();
        assert_eq!(valid.len(), 1);
        assert!(valid.contains_key(&InstallerKind::Brew));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'linux'"));
    }

    #[test]
    fn test_unknown_command_key_fails() {
        let commands: BTreeMap<String, String> =
            [("zypper".to_string(), "zypper in jq".to_string())]
                .into_iter()
                .collect();
        assert!(matches!(
            validate_install_command_keys("jq", &commands),
            Err(Error::UnknownInstallerKind { .. })
        ));
    }

    fn package_spec(manager: &str) -> PackageManagerInstall {
        PackageManagerInstall {
            manager: manager.into(),
            tap: None,
            bucket: None,
            package: "jq".into(),
            package_type: None,
            flags: vec![],
            destination: None,
            bin_name: None,
        }
    }

    #[test]
    fn test_only_adapter_backed_managers_accepted() {
        assert!(validate_package_manager("jq", &package_spec("brew")).is_ok());
        assert!(validate_package_manager("jq", &package_spec("Scoop")).is_ok());
        for manager in ["apt", "manual", "artifact", "winget"] {
            let err = validate_package_manager("jq", &package_spec(manager)).unwrap_err();
            assert!(err.is_configuration(), "{manager} should be rejected");
            assert!(err.to_string().contains("adapter"));
        }
    }

    #[test]
    fn test_path_segments() {
        assert!(is_path_segment("1.4.1"));
        assert!(is_path_segment("v2.0.0-rc.1"));
        assert!(is_path_segment("golangci-lint"));
        for bad in ["", " ", ".", "..", "../../x", "a/b", "a\\b", "1..2"] {
            assert!(!is_path_segment(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_scoop_rejects_tap() {
        let spec = PackageManagerInstall {
            manager: "scoop".into(),
            tap: Some("owner/tap".into()),
            bucket: None,
            package: "jq".into(),
            package_type: None,
            flags: vec![],
            destination: None,
            bin_name: None,
        };
        let err = validate_package_manager("jq", &spec).unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }
}

//! Binary resolution.
//!
//! [`BinaryResolver::resolve`] locates a tool's executable without touching
//! the network. Precedence, first match wins:
//!
//! 1. the override variable (`TOOLDOCK_TOOL_<NAME>` by default) naming an existing path
//! 2. a managed install `<root>/bin/<tool>@<version>/<binary>[.exe]`; the
//!    highest version wins when several are installed
//! 3. `PATH`, when allowed

use crate::error::{Avenues, Remediation};
use crate::paths::{ToolPaths, executable_name};
use crate::platform::Os;
use crate::{Error, Result};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::debug;

/// Options for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Environment variable holding an explicit binary path.
    pub override_env: Option<String>,
    /// Fall back to a `PATH` lookup.
    pub allow_path: bool,
    /// Binary file name when it differs from the tool name.
    pub binary_name: Option<String>,
}

impl ResolveOptions {
    /// Options using the tool's default override variable.
    #[must_use]
    pub fn for_tool(tool: &str) -> Self {
        Self {
            override_env: Some(default_override_var(tool)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn allow_path(mut self, allow: bool) -> Self {
        self.allow_path = allow;
        self
    }

    #[must_use]
    pub fn binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = Some(name.into());
        self
    }
}

/// `TOOLDOCK_TOOL_<NAME>`: uppercased, `-` and `.` replaced with `_`.
#[must_use]
pub fn default_override_var(tool: &str) -> String {
    let name: String = tool
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect();
    format!("TOOLDOCK_TOOL_{name}")
}

/// Locates tool executables.
#[derive(Debug, Clone)]
pub struct BinaryResolver {
    paths: ToolPaths,
    os: Os,
}

impl BinaryResolver {
    #[must_use]
    pub fn new(paths: ToolPaths) -> Self {
        Self {
            paths,
            os: Os::current(),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    /// Resolve `tool` to an executable path.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] listing only the avenues that were tried, with one
    /// suggestion each.
    pub fn resolve(&self, tool: &str, options: &ResolveOptions) -> Result<PathBuf> {
        let binary = options.binary_name.as_deref().unwrap_or(tool);
        let mut tried = Vec::new();
        let mut suggestions = Vec::new();

        if let Some(var) = &options.override_env {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                let path = PathBuf::from(&value);
                if path.exists() {
                    debug!(%tool, %var, path = %path.display(), "Resolved from override");
                    return Ok(path);
                }
                debug!(%tool, %var, path = %path.display(), "Override points at a missing path");
            }
            tried.push(format!("${var}"));
            suggestions.push(format!("set {var} to the path of an existing '{binary}' binary"));
        }

        if let Some(path) = self.find_managed(tool, binary) {
            debug!(%tool, path = %path.display(), "Resolved managed install");
            return Ok(path);
        }
        tried.push(self.paths.bin_dir().display().to_string());
        suggestions.push(format!(
            "install a managed copy through the artifact installer into {}",
            self.paths.bin_dir().display()
        ));

        if options.allow_path {
            if let Ok(path) = which::which(binary) {
                debug!(%tool, path = %path.display(), "Resolved from PATH");
                return Ok(path);
            }
            tried.push("PATH".to_string());
            suggestions.push(format!("install '{binary}' and add it to PATH"));
        }

        Err(Error::NotFound {
            tool: tool.to_string(),
            tried: Avenues::new(tried),
            remediation: Remediation::new(suggestions),
        })
    }

    /// Highest installed `<tool>@<version>` containing the binary.
    fn find_managed(&self, tool: &str, binary: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.paths.bin_dir()).ok()?;
        let prefix = format!("{tool}@");
        let file = executable_name(binary, self.os);

        entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let version = name.strip_prefix(&prefix)?.to_string();
                let candidate = entry.path().join(&file);
                candidate.is_file().then_some((version, candidate))
            })
            .max_by(|(a, _), (b, _)| compare_versions(a, b))
            .map(|(_, path)| path)
    }
}

/// Order version strings: semver where both parse, semver above non-semver,
/// otherwise lexical.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Lenient semver: leading `v` stripped, `1` and `1.2` padded with zeros.
fn parse_version(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }
    let (core, rest) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn install(root: &Path, tool: &str, version: &str, binary: &str) -> PathBuf {
        let dir = root.join("bin").join(format!("{tool}@{version}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(executable_name(binary, Os::current()));
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        path
    }

    #[test]
    fn test_default_override_var() {
        assert_eq!(default_override_var("syft"), "TOOLDOCK_TOOL_SYFT");
        assert_eq!(
            default_override_var("golangci-lint"),
            "TOOLDOCK_TOOL_GOLANGCI_LINT"
        );
        assert_eq!(default_override_var("node.js"), "TOOLDOCK_TOOL_NODE_JS");
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("v2.0.0", "1.99.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0", "nightly"), Ordering::Greater);
        assert_eq!(compare_versions("beta", "alpha"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0-rc.1", "1.0.0"), Ordering::Less);
    }

    #[test]
    fn test_override_wins_over_managed() {
        let dir = tempfile::TempDir::new().unwrap();
        install(dir.path(), "syft", "1.0.0", "syft");
        let custom = dir.path().join("custom-syft");
        std::fs::write(&custom, b"").unwrap();

        let resolver = BinaryResolver::new(ToolPaths::new(dir.path()));
        temp_env::with_var("TOOLDOCK_TOOL_SYFT", Some(custom.as_os_str()), || {
            let path = resolver
                .resolve("syft", &ResolveOptions::for_tool("syft"))
                .unwrap();
            assert_eq!(path, custom);
        });
    }

    #[test]
    fn test_missing_override_falls_through_to_managed() {
        let dir = tempfile::TempDir::new().unwrap();
        let managed = install(dir.path(), "syft", "1.0.0", "syft");
        let resolver = BinaryResolver::new(ToolPaths::new(dir.path()));
        temp_env::with_var("TOOLDOCK_TOOL_SYFT", Some("/definitely/not/here"), || {
            let path = resolver
                .resolve("syft", &ResolveOptions::for_tool("syft"))
                .unwrap();
            assert_eq!(path, managed);
        });
    }

    #[test]
    fn test_highest_managed_version_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        install(dir.path(), "grype", "0.9.0", "grype");
        let newest = install(dir.path(), "grype", "0.10.0", "grype");
        install(dir.path(), "grype", "nightly", "grype");
        // Different tool sharing a prefix.
        install(dir.path(), "grype-db", "9.9.9", "grype");

        let resolver = BinaryResolver::new(ToolPaths::new(dir.path()));
        let path = resolver
            .resolve("grype", &ResolveOptions::default())
            .unwrap();
        assert_eq!(path, newest);
    }

    #[test]
    fn test_managed_dir_without_binary_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("bin").join("jq@2.0.0")).unwrap();
        let older = install(dir.path(), "jq", "1.7.1", "jq");

        let resolver = BinaryResolver::new(ToolPaths::new(dir.path()));
        let path = resolver.resolve("jq", &ResolveOptions::default()).unwrap();
        assert_eq!(path, older);
    }

    #[test]
    fn test_binary_name_option() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = install(dir.path(), "ripgrep", "14.1.0", "rg");
        let resolver = BinaryResolver::new(ToolPaths::new(dir.path()));
        let found = resolver
            .resolve("ripgrep", &ResolveOptions::default().binary_name("rg"))
            .unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn test_not_found_lists_tried_avenues() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = BinaryResolver::new(ToolPaths::new(dir.path()));
        let tool = "tooldock-absent-tool";

        let err = temp_env::with_var_unset(default_override_var(tool), || {
            resolver
                .resolve(tool, &ResolveOptions::for_tool(tool).allow_path(true))
                .unwrap_err()
        });
        match err {
            Error::NotFound {
                tried, remediation, ..
            } => {
                assert_eq!(tried.as_slice().len(), 3);
                assert_eq!(tried.as_slice()[2], "PATH");
                assert_eq!(remediation.suggestions().len(), 3);
            }
            other => panic!("unexpected error {other:?}"),
        }

        // PATH is not mentioned when it was not consulted.
        let err = resolver
            .resolve(tool, &ResolveOptions::default())
            .unwrap_err();
        match err {
            Error::NotFound { tried, .. } => {
                assert_eq!(tried.as_slice().len(), 1);
                assert!(!tried.as_slice().contains(&"PATH".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_precedence_chain() {
        use std::os::unix::fs::PermissionsExt;

        let tool = "tooldock-chain-tool";
        let var = default_override_var(tool);
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("root");
        let managed = install(&root, tool, "2.0.0", tool);

        let path_dir = dir.path().join("path-bin");
        std::fs::create_dir_all(&path_dir).unwrap();
        let on_path = path_dir.join(tool);
        std::fs::write(&on_path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&on_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let custom = dir.path().join("custom");
        std::fs::write(&custom, b"").unwrap();

        let resolver = BinaryResolver::new(ToolPaths::new(root.clone()));
        let with_path = ResolveOptions::for_tool(tool).allow_path(true);
        let resolve = |override_value: Option<&Path>, options: &ResolveOptions| {
            temp_env::with_vars(
                [
                    ("PATH", Some(path_dir.as_os_str())),
                    (var.as_str(), override_value.map(Path::as_os_str)),
                ],
                || resolver.resolve(tool, options),
            )
        };

        // All three present: the override wins.
        assert_eq!(resolve(Some(&custom), &with_path).unwrap(), custom);

        // Override gone: managed beats PATH.
        assert_eq!(resolve(None, &with_path).unwrap(), managed);

        // Managed gone: PATH.
        std::fs::remove_dir_all(root.join("bin")).unwrap();
        assert_eq!(resolve(None, &with_path).unwrap(), on_path);

        // PATH binary gone: every avenue reported.
        std::fs::remove_file(&on_path).unwrap();
        match resolve(None, &with_path).unwrap_err() {
            Error::NotFound { tried, .. } => assert_eq!(tried.as_slice().len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_path_fallback() {
        let dir = tempfile::TempDir::new().unwrap();
        let path_dir = dir.path().join("path-bin");
        std::fs::create_dir_all(&path_dir).unwrap();
        let binary = path_dir.join("tooldock-path-tool");
        std::fs::write(&binary, b"#!/bin/sh\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let resolver = BinaryResolver::new(ToolPaths::new(dir.path().join("root")));
        temp_env::with_var("PATH", Some(path_dir.as_os_str()), || {
            let found = resolver
                .resolve(
                    "tooldock-path-tool",
                    &ResolveOptions::default().allow_path(true),
                )
                .unwrap();
            assert_eq!(found, binary);
            assert!(
                resolver
                    .resolve("tooldock-path-tool", &ResolveOptions::default())
                    .is_err()
            );
        });
    }
}

//! Layout of the managed tools root.
//!
//! | Path | Contents |
//! |------|----------|
//! | `<root>/bin/<tool>@<version>/<binary>[.exe]` | installed binaries |
//! | `<root>/cache/<tool>/<version>/<filename>` | downloaded release archives |
//!
//! The root resolves from `TOOLDOCK_HOME`, falling back to the platform data
//! directory (`~/.local/share/tooldock`, `~/Library/Application Support/tooldock`,
//! `%LOCALAPPDATA%\tooldock`).

use crate::platform::Os;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the tools root.
pub const HOME_VAR: &str = "TOOLDOCK_HOME";

/// Paths below the managed tools root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    root: PathBuf,
}

impl ToolPaths {
    /// Use an explicit root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root from `TOOLDOCK_HOME` or the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined.
    pub fn from_env() -> Result<Self> {
        if let Ok(dir) = std::env::var(HOME_VAR)
            && !dir.is_empty()
        {
            return Ok(Self::new(dir));
        }

        let base = dirs::data_local_dir()
            .ok_or_else(|| Error::configuration("Could not determine data directory"))?;
        Ok(Self::new(base.join("tooldock")))
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/bin`
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// `<root>/cache`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// `<root>/bin/<tool>@<version>`
    #[must_use]
    pub fn managed_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.bin_dir().join(format!("{tool}@{version}"))
    }

    /// `<root>/bin/<tool>@<version>/<binary>[.exe]` for `os`.
    #[must_use]
    pub fn managed_binary(&self, tool: &str, version: &str, binary: &str, os: Os) -> PathBuf {
        self.managed_dir(tool, version)
            .join(executable_name(binary, os))
    }

    /// `<root>/cache/<tool>/<version>/<filename>`
    #[must_use]
    pub fn cache_file(&self, tool: &str, version: &str, filename: &str) -> PathBuf {
        self.cache_dir().join(tool).join(version).join(filename)
    }
}

/// Binary file name on `os` (`.exe` appended on Windows unless present).
#[must_use]
pub fn executable_name(binary: &str, os: Os) -> String {
    let suffix = os.exe_suffix();
    if suffix.is_empty() || binary.to_ascii_lowercase().ends_with(suffix) {
        binary.to_string()
    } else {
        format!("{binary}{suffix}")
    }
}

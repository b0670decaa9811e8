//! Error types for tooldock operations.

use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The avenues an operation tried before giving up (e.g. `$TOOLDOCK_TOOL_JQ`, `PATH`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Avenues(Vec<String>);

impl Avenues {
    /// Create from a list of avenue descriptions.
    #[must_use]
    pub fn new(items: Vec<String>) -> Self {
        Self(items)
    }

    /// The avenues, in the order they were tried.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Avenues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "nothing");
        }
        write!(f, "{}", self.0.join(", "))
    }
}

/// Concrete next actions offered to the user alongside a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remediation(Vec<String>);

impl Remediation {
    /// Create from a list of suggestions.
    #[must_use]
    pub fn new(suggestions: Vec<String>) -> Self {
        Self(suggestions)
    }

    /// The individual suggestions.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.0
    }

    /// Whether there is nothing to suggest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, suggestion) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {suggestion}")?;
        }
        Ok(())
    }
}

/// Main error type for tooldock operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(tooldock::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// A tool declares both `install` and `install_commands`
    #[error("Tool '{tool}': `install` and `install_commands` are mutually exclusive")]
    #[diagnostic(
        code(tooldock::config::mutually_exclusive),
        help("keep either the package_manager `install` block or the legacy `install_commands` map")
    )]
    MutuallyExclusive {
        /// The offending tool
        tool: String,
    },

    /// An installer kind outside the known set
    #[error("Unknown installer kind '{kind}'")]
    #[diagnostic(code(tooldock::config::unknown_installer))]
    UnknownInstallerKind {
        /// The unrecognized identifier
        kind: String,
        /// The identifiers that are accepted
        #[help]
        known: String,
    },

    /// The requested artifact version is not in the manifest
    #[error("Tool '{tool}' has no artifact version '{version}' (available: {available})")]
    #[diagnostic(code(tooldock::artifact::version_not_found))]
    VersionNotFound {
        /// The tool
        tool: String,
        /// The requested version
        version: String,
        /// Versions the manifest does declare
        available: Avenues,
    },

    /// The manifest has no artifact for the running platform
    #[error("Tool '{tool}' {version} has no artifact for platform '{platform}'")]
    #[diagnostic(code(tooldock::artifact::platform_unavailable))]
    ArtifactUnavailable {
        /// The tool
        tool: String,
        /// The resolved version
        version: String,
        /// The artifact key that was looked up (e.g. `linux_amd64`)
        platform: String,
    },

    /// A binary could not be located
    #[error("Tool '{tool}' not found (tried: {tried})")]
    #[diagnostic(code(tooldock::resolve::not_found))]
    NotFound {
        /// The tool
        tool: String,
        /// Locations that were checked
        tried: Avenues,
        /// What the user can do about it
        #[help]
        remediation: Remediation,
    },

    /// Every installer attempt failed or was skipped
    #[error("Tool '{tool}' could not be installed (tried: {tried})")]
    #[diagnostic(code(tooldock::install::exhausted))]
    NotInstalled {
        /// The tool
        tool: String,
        /// Installer attempts with their outcome
        tried: Avenues,
        /// Manual instructions
        #[help]
        remediation: Remediation,
    },

    /// A package manager is not installed on this machine
    #[error("Package manager '{manager}' is not available")]
    #[diagnostic(code(tooldock::manager::unavailable))]
    ManagerUnavailable {
        /// The manager identifier
        manager: String,
        /// How to get it
        #[help]
        remediation: Remediation,
    },

    /// A subprocess exited unsuccessfully
    #[error("Command `{command}` failed ({status}): {output}")]
    #[diagnostic(code(tooldock::process::failed))]
    CommandFailed {
        /// The command line
        command: String,
        /// Exit status description
        status: String,
        /// Combined stdout and stderr
        output: String,
    },

    /// A subprocess could not be started
    #[error("Failed to start `{program}`: {source}")]
    #[diagnostic(code(tooldock::process::spawn))]
    Spawn {
        /// The program
        program: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A step of an installation failed
    #[error("Failed to install '{tool}' during {step}: {source}")]
    #[diagnostic(code(tooldock::install::step))]
    Install {
        /// The tool
        tool: String,
        /// The step that failed (download, verify, extract, ...)
        step: String,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No executor can run a tool
    #[error("No executor can run '{tool}' (tried: {tried})")]
    #[diagnostic(code(tooldock::exec::unavailable))]
    NoExecutor {
        /// The tool
        tool: String,
        /// Executors that were considered
        tried: Avenues,
        /// What the user can do about it
        #[help]
        remediation: Remediation,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(tooldock::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    #[diagnostic(code(tooldock::cancelled))]
    Cancelled,
}

impl Error {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Wrap a lower-level failure with the tool and step it happened in
    pub fn install<E>(tool: impl Into<String>, step: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Install {
            tool: tool.into(),
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Create an unknown installer kind error
    pub fn unknown_installer(kind: impl Into<String>) -> Self {
        Self::UnknownInstallerKind {
            kind: kind.into(),
            known: format!(
                "known installer kinds: {}",
                crate::kind::InstallerKind::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Remediation attached to this error, if any
    #[must_use]
    pub fn remediation(&self) -> Option<&Remediation> {
        match self {
            Self::NotFound { remediation, .. }
            | Self::NotInstalled { remediation, .. }
            | Self::ManagerUnavailable { remediation, .. }
            | Self::NoExecutor { remediation, .. } => Some(remediation),
            _ => None,
        }
    }

    /// Whether this is a configuration problem (fatal for the tool, never retried)
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::MutuallyExclusive { .. }
                | Self::UnknownInstallerKind { .. }
                | Self::VersionNotFound { .. }
                | Self::ArtifactUnavailable { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io(source, None, "filesystem access")
    }
}

/// Result type for tooldock operations
pub type Result<T> = std::result::Result<T, Error>;

//! Execution mode selection.

use std::fmt;

/// How tools are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Run on the host.
    Local,
    /// Run inside the tools container.
    Docker,
    /// Pick per invocation.
    #[default]
    Auto,
}

impl ExecutionMode {
    /// Case-insensitive; anything unrecognized means [`ExecutionMode::Auto`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "docker" => Self::Docker,
            _ => Self::Auto,
        }
    }

    /// Lowercase name, as accepted by [`ExecutionMode::parse`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Docker => "docker",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Installer kinds.
//!
//! An installer kind names one installation mechanism: a system package
//! manager, a language-toolchain installer, a bootstrap manager, a manual
//! script, or the managed artifact pipeline. The set is closed; catalog keys
//! outside it are rejected at parse time.

use crate::platform::Os;
use crate::{Error, Result};
use std::fmt;

/// One installation mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstallerKind {
    /// Homebrew (formula-style manager).
    Brew,
    /// Scoop (bucket-style manager).
    Scoop,
    /// Windows Package Manager.
    Winget,
    /// Chocolatey.
    Choco,
    /// Debian/Ubuntu.
    Apt,
    /// Fedora/RHEL.
    Dnf,
    /// Arch Linux.
    Pacman,
    /// Alpine.
    Apk,
    /// mise bootstrap manager.
    Mise,
    /// aqua bootstrap manager.
    Aqua,
    /// `cargo install`.
    Cargo,
    /// `go install`.
    Go,
    /// `npm install -g`.
    Npm,
    /// `pipx install`.
    Pipx,
    /// `uv tool install`.
    Uv,
    /// A printed/bootstrap shell script; always considered available.
    Manual,
    /// The managed download/verify/extract pipeline.
    Artifact,
}

impl InstallerKind {
    /// Every known kind.
    pub const ALL: [Self; 17] = [
        Self::Brew,
        Self::Scoop,
        Self::Winget,
        Self::Choco,
        Self::Apt,
        Self::Dnf,
        Self::Pacman,
        Self::Apk,
        Self::Mise,
        Self::Aqua,
        Self::Cargo,
        Self::Go,
        Self::Npm,
        Self::Pipx,
        Self::Uv,
        Self::Manual,
        Self::Artifact,
    ];

    /// Identifier used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brew => "brew",
            Self::Scoop => "scoop",
            Self::Winget => "winget",
            Self::Choco => "choco",
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Apk => "apk",
            Self::Mise => "mise",
            Self::Aqua => "aqua",
            Self::Cargo => "cargo",
            Self::Go => "go",
            Self::Npm => "npm",
            Self::Pipx => "pipx",
            Self::Uv => "uv",
            Self::Manual => "manual",
            Self::Artifact => "artifact",
        }
    }

    /// Parse a configuration identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownInstallerKind`] for identifiers outside the known set.
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        let kind = match normalized.as_str() {
            "brew" | "homebrew" => Self::Brew,
            "scoop" => Self::Scoop,
            "winget" => Self::Winget,
            "choco" | "chocolatey" => Self::Choco,
            "apt" | "apt-get" => Self::Apt,
            "dnf" | "yum" => Self::Dnf,
            "pacman" => Self::Pacman,
            "apk" => Self::Apk,
            "mise" => Self::Mise,
            "aqua" => Self::Aqua,
            "cargo" => Self::Cargo,
            "go" => Self::Go,
            "npm" => Self::Npm,
            "pipx" => Self::Pipx,
            "uv" => Self::Uv,
            "manual" | "script" => Self::Manual,
            "artifact" => Self::Artifact,
            _ => return Err(Error::unknown_installer(s)),
        };
        Ok(kind)
    }

    /// Program whose presence on PATH makes this kind available.
    ///
    /// `None` for kinds that need no pre-existing binary.
    #[must_use]
    pub fn program(self) -> Option<&'static str> {
        match self {
            Self::Manual | Self::Artifact => None,
            Self::Apt => Some("apt-get"),
            other => Some(other.as_str()),
        }
    }

    /// `manual` and `artifact` never depend on a pre-installed binary.
    #[must_use]
    pub fn is_always_available(self) -> bool {
        self.program().is_none()
    }

    /// Where to get the installer itself; `None` for OS-provided managers.
    #[must_use]
    pub fn docs_url(self) -> Option<&'static str> {
        match self {
            Self::Brew => Some("https://brew.sh"),
            Self::Scoop => Some("https://scoop.sh"),
            Self::Winget => Some("https://learn.microsoft.com/windows/package-manager/winget/"),
            Self::Choco => Some("https://chocolatey.org/install"),
            Self::Mise => Some("https://mise.jdx.dev/getting-started.html"),
            Self::Aqua => Some("https://aquaproj.github.io/docs/install"),
            Self::Cargo => Some("https://rustup.rs"),
            Self::Go => Some("https://go.dev/doc/install"),
            Self::Npm => Some("https://nodejs.org/en/download"),
            Self::Pipx => Some("https://pipx.pypa.io/stable/installation/"),
            Self::Uv => Some("https://docs.astral.sh/uv/getting-started/installation/"),
            Self::Apt
            | Self::Dnf
            | Self::Pacman
            | Self::Apk
            | Self::Manual
            | Self::Artifact => None,
        }
    }

    /// Fallback installer priority when a tool declares none.
    #[must_use]
    pub fn default_priority(os: Os) -> &'static [Self] {
        match os {
            Os::Darwin => &[Self::Mise, Self::Brew, Self::Manual],
            Os::Linux => &[
                Self::Mise,
                Self::Brew,
                Self::Apt,
                Self::Dnf,
                Self::Pacman,
                Self::Apk,
                Self::Manual,
            ],
            Os::Windows => &[Self::Scoop, Self::Winget, Self::Choco, Self::Manual],
        }
    }
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a legacy `install_commands` key is a platform name rather than an
/// installer kind (a common mistake carried over from the old schema).
#[must_use]
pub fn is_platform_key(key: &str) -> bool {
    Os::parse(key).is_some()
}

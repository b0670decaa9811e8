//! Core types for the tooldock tool acquisition engine.
//!
//! This crate holds everything the installer backends, the installer strategy
//! engine and the execution router share:
//!
//! - [`catalog`] - the parsed, validated tool catalog ([`Tool`], [`Scope`], [`Config`])
//! - [`platform`] - [`Platform`], [`Os`] and [`Arch`] identification
//! - [`kind`] - the closed set of [`InstallerKind`]s
//! - [`manager`] - the [`PackageManager`] / [`PackageInstaller`] adapter contract
//! - [`resolver`] - the [`BinaryResolver`] used to locate tool executables
//! - [`process`] - cancellable subprocess execution behind [`CommandRunner`]
//! - [`paths`] and [`settings`] - the managed tools root and environment overrides
//! - [`ci`] - CI environment detection
//!
//! # Example
//!
//! ```ignore
//! use tooldock_core::{BinaryResolver, Config, ResolveOptions, ToolPaths};
//!
//! let config = Config::from_path("tools.yaml".as_ref())?;
//! let resolver = BinaryResolver::new(ToolPaths::from_env()?);
//! let syft = resolver.resolve("syft", &ResolveOptions::for_tool("syft").allow_path(true))?;
//! ```

pub mod catalog;
pub mod ci;
mod error;
pub mod kind;
pub mod manager;
pub mod paths;
pub mod platform;
pub mod process;
pub mod resolver;
pub mod settings;

pub use catalog::{
    Artifact, ArtifactManifest, Config, InstallStrategy, PackageManagerInstall, PackageType,
    PlatformSet, Scope, Tool, ToolKind, ValidationWarning, VersionArtifacts,
};
pub use error::{Avenues, Error, Remediation, Result};
pub use kind::InstallerKind;
pub use manager::{
    InstallOptions, ManagerLocation, ManagerRegistry, PackageInstallOutcome, PackageInstaller,
    PackageManager, ProbeTier,
};
pub use paths::ToolPaths;
pub use platform::{Arch, Os, Platform};
pub use process::{CommandRunner, CommandSpec, ProcessOutput, SystemRunner};
pub use resolver::{BinaryResolver, ResolveOptions};
pub use settings::Settings;

/// Re-exported so downstream crates share one cancellation type.
pub use tokio_util::sync::CancellationToken;

//! Installer strategy engine.
//!
//! Given a [`Tool`](tooldock_core::Tool), [`InstallEngine`] builds the ordered
//! list of installer attempts for the running platform, marks each one
//! available or not, and runs them one at a time until one succeeds:
//!
//! ```ignore
//! let engine = InstallEngine::from_settings(&Settings::from_env()?)?;
//! let report = engine.install_tool(tool, &InstallOptions::default()).await?;
//! println!("installed {} with {}", report.tool, report.installer);
//! ```

mod attempt;
mod engine;
mod executor;

pub use attempt::{AttemptRecord, AttemptStatus, InstallerAttempt, attempt_command, attempt_order};
pub use engine::{AvailabilityProbe, InstallEngine, InstallReport, SystemProbe, default_registry};
pub use executor::{AttemptExecutor, AttemptOutcome, DefaultExecutor};

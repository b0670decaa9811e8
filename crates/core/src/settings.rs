//! Engine settings read from `TOOLDOCK_*` environment variables.

use crate::paths::ToolPaths;
use crate::Result;
use std::time::Duration;
use tracing::warn;

/// `local|docker|auto`
pub const EXEC_MODE_VAR: &str = "TOOLDOCK_EXEC_MODE";
/// Image used by the Docker executor.
pub const DOCKER_IMAGE_VAR: &str = "TOOLDOCK_DOCKER_IMAGE";
/// Container runtime binary (`docker`, `podman`, ...).
pub const CONTAINER_RUNTIME_VAR: &str = "TOOLDOCK_CONTAINER_RUNTIME";
/// Artifact download timeout in seconds.
pub const DOWNLOAD_TIMEOUT_VAR: &str = "TOOLDOCK_DOWNLOAD_TIMEOUT";

/// Image used when `TOOLDOCK_DOCKER_IMAGE` is unset.
pub const DEFAULT_DOCKER_IMAGE: &str = "ghcr.io/tooldock/tools:latest";
/// Runtime used when `TOOLDOCK_CONTAINER_RUNTIME` is unset.
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
/// Five minutes.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Managed tools layout.
    pub paths: ToolPaths,
    /// Raw execution mode; interpreted by the execution router.
    pub exec_mode: Option<String>,
    /// Image for containerized runs.
    pub docker_image: String,
    /// Container runtime binary.
    pub container_runtime: String,
    /// Per-download timeout.
    pub download_timeout: Duration,
}

impl Settings {
    /// Defaults rooted at `paths`.
    #[must_use]
    pub fn new(paths: ToolPaths) -> Self {
        Self {
            paths,
            exec_mode: None,
            docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
            container_runtime: DEFAULT_CONTAINER_RUNTIME.to_string(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Read every `TOOLDOCK_*` variable; unset or empty values keep defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the tools root cannot be determined.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::new(ToolPaths::from_env()?);
        settings.exec_mode = non_empty(EXEC_MODE_VAR);
        if let Some(image) = non_empty(DOCKER_IMAGE_VAR) {
            settings.docker_image = image;
        }
        if let Some(runtime) = non_empty(CONTAINER_RUNTIME_VAR) {
            settings.container_runtime = runtime;
        }
        if let Some(raw) = non_empty(DOWNLOAD_TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => settings.download_timeout = Duration::from_secs(secs),
                _ => warn!(
                    value = %raw,
                    "ignoring invalid {DOWNLOAD_TIMEOUT_VAR}, expected a positive number of seconds"
                ),
            }
        }
        Ok(settings)
    }
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("TOOLDOCK_HOME", Some("/tmp/td")),
                (EXEC_MODE_VAR, None),
                (DOCKER_IMAGE_VAR, None),
                (CONTAINER_RUNTIME_VAR, None),
                (DOWNLOAD_TIMEOUT_VAR, None),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.exec_mode, None);
                assert_eq!(settings.container_runtime, "docker");
                assert_eq!(settings.docker_image, DEFAULT_DOCKER_IMAGE);
                assert_eq!(settings.download_timeout, Duration::from_secs(300));
            },
        );
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("TOOLDOCK_HOME", Some("/tmp/td")),
                (EXEC_MODE_VAR, Some("docker")),
                (DOCKER_IMAGE_VAR, Some("example/tools:1")),
                (CONTAINER_RUNTIME_VAR, Some("podman")),
                (DOWNLOAD_TIMEOUT_VAR, Some("30")),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.exec_mode.as_deref(), Some("docker"));
                assert_eq!(settings.docker_image, "example/tools:1");
                assert_eq!(settings.container_runtime, "podman");
                assert_eq!(settings.download_timeout, Duration::from_secs(30));
            },
        );
    }

    #[test]
    fn test_invalid_timeout_keeps_default() {
        temp_env::with_vars(
            [
                ("TOOLDOCK_HOME", Some("/tmp/td")),
                (DOWNLOAD_TIMEOUT_VAR, Some("soon")),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.download_timeout, DEFAULT_DOWNLOAD_TIMEOUT);
            },
        );
    }
}

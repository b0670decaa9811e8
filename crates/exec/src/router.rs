//! Dispatch to the executor the configured mode names.

use crate::auto::AutoExecutor;
use crate::docker::DockerExecutor;
use crate::executor::{ExecOptions, ExecResult, Executor};
use crate::local::LocalExecutor;
use crate::mode::ExecutionMode;
use std::sync::Arc;
use tooldock_core::{Result, Settings};
use tracing::info;

/// Holds the three executors and dispatches to the one the mode names.
#[derive(Clone)]
pub struct ExecutionRouter {
    mode: ExecutionMode,
    local: Arc<dyn Executor>,
    docker: Arc<dyn Executor>,
    auto: AutoExecutor,
}

impl ExecutionRouter {
    /// Router over explicit executors.
    #[must_use]
    pub fn new(mode: ExecutionMode, local: Arc<dyn Executor>, docker: Arc<dyn Executor>) -> Self {
        Self {
            mode,
            auto: AutoExecutor::new(local.clone(), docker.clone()),
            local,
            docker,
        }
    }

    /// Router configured from `settings`; an execution-mode override there
    /// replaces the default [`ExecutionMode::Auto`].
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mode = settings
            .exec_mode
            .as_deref()
            .map_or(ExecutionMode::Auto, ExecutionMode::parse);
        let docker = Arc::new(DockerExecutor::from_settings(settings));
        let mut router = Self::new(mode, Arc::new(LocalExecutor::new()), docker);
        router.auto = router
            .auto
            .with_image(&settings.container_runtime, &settings.docker_image);
        info!(mode = %mode, "Execution router ready");
        router
    }

    /// Replace the auto executor.
    #[must_use]
    pub fn with_auto(mut self, auto: AutoExecutor) -> Self {
        self.auto = auto;
        self
    }

    /// Configured mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// The executor for the configured mode.
    #[must_use]
    pub fn executor(&self) -> &dyn Executor {
        match self.mode {
            ExecutionMode::Local => self.local.as_ref(),
            ExecutionMode::Docker => self.docker.as_ref(),
            ExecutionMode::Auto => &self.auto,
        }
    }

    /// Run through [`Self::executor`].
    pub async fn execute(&self, options: &ExecOptions) -> Result<ExecResult> {
        self.executor().execute(options).await
    }
}

impl std::fmt::Debug for ExecutionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRouter")
            .field("mode", &self.mode)
            .field("auto", &self.auto)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tooldock_core::ToolPaths;

    fn settings(mode: Option<&str>) -> Settings {
        let mut settings = Settings::new(ToolPaths::new("/tmp/tooldock"));
        settings.exec_mode = mode.map(String::from);
        settings
    }

    #[test]
    fn test_mode_from_settings() {
        assert_eq!(
            ExecutionRouter::from_settings(&settings(None)).mode(),
            ExecutionMode::Auto
        );
        assert_eq!(
            ExecutionRouter::from_settings(&settings(Some("LOCAL"))).mode(),
            ExecutionMode::Local
        );
        assert_eq!(
            ExecutionRouter::from_settings(&settings(Some("docker")))
                .executor()
                .name(),
            "docker"
        );
        assert_eq!(
            ExecutionRouter::from_settings(&settings(Some("bogus")))
                .executor()
                .name(),
            "auto"
        );
    }
}

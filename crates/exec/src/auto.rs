//! Per-invocation executor selection.

use crate::executor::{ExecOptions, ExecResult, Executor};
use async_trait::async_trait;
use std::sync::Arc;
use tooldock_core::settings::{DEFAULT_CONTAINER_RUNTIME, DEFAULT_DOCKER_IMAGE, EXEC_MODE_VAR};
use tooldock_core::{Avenues, Error, Remediation, Result, ci};
use tracing::debug;

/// Chooses between a local and a container executor on every call.
///
/// In CI the container wins whenever it can run the tool, so results match
/// the pinned image. Elsewhere a locally resolvable tool wins and the
/// container is the fallback.
#[derive(Clone)]
pub struct AutoExecutor {
    local: Arc<dyn Executor>,
    docker: Arc<dyn Executor>,
    /// `None` reads the CI variables on each call.
    ci: Option<bool>,
    pull_command: String,
}

impl AutoExecutor {
    /// Auto selection over `local` and `docker`; CI is detected from the environment.
    #[must_use]
    pub fn new(local: Arc<dyn Executor>, docker: Arc<dyn Executor>) -> Self {
        Self {
            local,
            docker,
            ci: None,
            pull_command: format!("{DEFAULT_CONTAINER_RUNTIME} pull {DEFAULT_DOCKER_IMAGE}"),
        }
    }

    /// Pin CI detection instead of reading the environment.
    #[must_use]
    pub fn with_ci(mut self, ci: bool) -> Self {
        self.ci = Some(ci);
        self
    }

    /// Runtime and image named in the "pull the image" suggestion.
    #[must_use]
    pub fn with_image(mut self, runtime: &str, image: &str) -> Self {
        self.pull_command = format!("{runtime} pull {image}");
        self
    }

    /// The executor that would run `tool`, if any.
    pub async fn select(&self, tool: &str) -> Option<&Arc<dyn Executor>> {
        let in_ci = self.ci.unwrap_or_else(ci::is_ci);
        if in_ci && self.docker.is_available(tool).await {
            debug!(%tool, "CI detected, using container");
            return Some(&self.docker);
        }
        if self.local.is_available(tool).await {
            return Some(&self.local);
        }
        // In CI the container was already ruled out above.
        if !in_ci && self.docker.is_available(tool).await {
            return Some(&self.docker);
        }
        None
    }

    fn no_executor(&self, tool: &str) -> Error {
        Error::NoExecutor {
            tool: tool.to_string(),
            tried: Avenues::new(vec![
                format!("{} (not installed)", self.local.name()),
                format!("{} (unavailable or not in image)", self.docker.name()),
            ]),
            remediation: Remediation::new(vec![
                format!("install '{tool}' locally so it is on PATH"),
                format!("set {EXEC_MODE_VAR}=local or {EXEC_MODE_VAR}=docker to pick an executor"),
                format!("pull the tools image: {}", self.pull_command),
            ]),
        }
    }
}

#[async_trait]
impl Executor for AutoExecutor {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn is_available(&self, tool: &str) -> bool {
        self.select(tool).await.is_some()
    }

    async fn execute(&self, options: &ExecOptions) -> Result<ExecResult> {
        let executor = self
            .select(&options.tool)
            .await
            .ok_or_else(|| self.no_executor(&options.tool))?;
        debug!(tool = %options.tool, executor = executor.name(), "Auto-selected executor");
        executor.execute(options).await
    }
}

impl std::fmt::Debug for AutoExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoExecutor")
            .field("local", &self.local.name())
            .field("docker", &self.docker.name())
            .field("ci", &self.ci)
            .finish_non_exhaustive()
    }
}

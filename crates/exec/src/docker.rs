//! Container execution.

use crate::executor::{ExecOptions, ExecResult, Executor};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tooldock_core::settings::{DEFAULT_CONTAINER_RUNTIME, DEFAULT_DOCKER_IMAGE};
use tooldock_core::{
    Avenues, CancellationToken, CommandRunner, CommandSpec, Error, Remediation, Result,
    Settings, SystemRunner,
};
use tracing::{debug, info};

/// Tools shipped in the default tools image.
pub const DEFAULT_IMAGE_TOOLS: &[&str] = &[
    "actionlint",
    "gitleaks",
    "golangci-lint",
    "grype",
    "hadolint",
    "jq",
    "markdownlint",
    "ruff",
    "shellcheck",
    "shfmt",
    "syft",
    "trivy",
    "yamllint",
    "yq",
];

/// Mount point of the working directory inside the container.
const WORKDIR: &str = "/work";

/// Runs allow-listed tools inside the tools image.
pub struct DockerExecutor {
    runtime: String,
    image: String,
    allowed: BTreeSet<String>,
    runner: Arc<dyn CommandRunner>,
    /// Result of `<runtime> info`, checked once.
    runtime_ready: OnceCell<bool>,
}

impl Default for DockerExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_RUNTIME, DEFAULT_DOCKER_IMAGE)
    }
}

impl DockerExecutor {
    /// Runs tools in `image` via the `runtime` binary, limited to the image's default tool set.
    #[must_use]
    pub fn new(runtime: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            image: image.into(),
            allowed: DEFAULT_IMAGE_TOOLS.iter().map(|t| (*t).to_string()).collect(),
            runner: Arc::new(SystemRunner),
            runtime_ready: OnceCell::new(),
        }
    }

    /// Runtime and image from [`Settings`].
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.container_runtime, &settings.docker_image)
    }

    /// Replace the allow-list.
    #[must_use]
    pub fn with_allowed<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Run commands through `runner`.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Container image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Container runtime binary.
    #[must_use]
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Whether `tool` is in the image.
    #[must_use]
    pub fn allows(&self, tool: &str) -> bool {
        self.allowed.contains(tool)
    }

    async fn runtime_ready(&self) -> bool {
        *self
            .runtime_ready
            .get_or_init(|| async {
                let spec = CommandSpec::new(&self.runtime).arg("info");
                let ready = match self.runner.run(&spec, &CancellationToken::new()).await {
                    Ok(output) => output.success(),
                    Err(e) => {
                        debug!(runtime = %self.runtime, error = %e, "Container runtime not usable");
                        false
                    }
                };
                info!(runtime = %self.runtime, ready, "Checked container runtime");
                ready
            })
            .await
    }

    /// `<runtime> run --rm [-i] -v <dir>:/work -w /work [-e K=V ...] <image> <tool> <args...>`
    #[must_use]
    pub fn command(&self, options: &ExecOptions, work_dir: &std::path::Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.runtime).args(["run", "--rm"]);
        if options.stdin.is_some() {
            spec = spec.arg("-i");
        }
        spec = spec
            .arg("-v")
            .arg(format!("{}:{WORKDIR}", work_dir.display()))
            .args(["-w", WORKDIR]);
        // BTreeMap iteration keeps the flags sorted.
        for (key, value) in &options.env {
            spec = spec.arg("-e").arg(format!("{key}={value}"));
        }
        spec = spec
            .arg(&self.image)
            .arg(&options.tool)
            .args(options.args.iter().cloned());
        if let Some(input) = &options.stdin {
            spec = spec.stdin(input.clone());
        }
        spec
    }

    fn work_dir(options: &ExecOptions) -> Result<PathBuf> {
        match &options.work_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir()
                .map_err(|e| Error::io(e, None, "determine working directory")),
        }
    }
}

#[async_trait]
impl Executor for DockerExecutor {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn is_available(&self, tool: &str) -> bool {
        self.allows(tool) && self.runtime_ready().await
    }

    async fn execute(&self, options: &ExecOptions) -> Result<ExecResult> {
        if !self.allows(&options.tool) {
            return Err(Error::NoExecutor {
                tool: options.tool.clone(),
                tried: Avenues::new(vec![format!("docker (not in image {})", self.image)]),
                remediation: Remediation::new(vec![
                    format!("install '{}' locally", options.tool),
                    "set TOOLDOCK_EXEC_MODE=local".to_string(),
                ]),
            });
        }
        let spec = self.command(options, &Self::work_dir(options)?);
        debug!(tool = %options.tool, command = %spec.display(), "Running in container");
        let output = self.runner.run(&spec, &options.cancel).await?;
        Ok(ExecResult::from_output(output, self.name()))
    }
}

impl std::fmt::Debug for DockerExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerExecutor")
            .field("runtime", &self.runtime)
            .field("image", &self.image)
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}

//! Host execution.

use crate::executor::{ExecOptions, ExecResult, Executor};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tooldock_core::paths::executable_name;
use tooldock_core::{
    Avenues, CommandRunner, CommandSpec, Error, Os, Remediation, Result, SystemRunner,
};
use tooldock_tools_brew::Brew;
use tracing::debug;

/// Directories third-party toolchains and version managers put executables
/// in, whether or not they are on `PATH`.
#[must_use]
pub fn shim_dirs(home: &Path, os: Os) -> Vec<PathBuf> {
    let gopath = std::env::var_os("GOPATH").map_or_else(|| home.join("go"), PathBuf::from);
    let aqua_root = std::env::var_os("AQUA_ROOT_DIR").map_or_else(
        || home.join(".local/share/aquaproj-aqua"),
        PathBuf::from,
    );
    let mut dirs = vec![
        home.join(".cargo").join("bin"),
        gopath.join("bin"),
        home.join(".local").join("bin"),
        home.join(".local/share/mise/shims"),
        home.join(".asdf").join("shims"),
        aqua_root.join("bin"),
    ];
    if os == Os::Windows {
        dirs.extend(tooldock_tools_scoop::user_shims_dir());
    }
    dirs
}

/// Runs tools found on `PATH`, in the Homebrew bin directory or in a known
/// shim directory.
#[derive(Clone)]
pub struct LocalExecutor {
    use_path: bool,
    /// Homebrew bin dir followed by the shim dirs; probed once at construction.
    search_dirs: Vec<PathBuf>,
    os: Os,
    runner: Arc<dyn CommandRunner>,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalExecutor {
    /// Looks on `PATH`, then in Homebrew's bin directory and version-manager shims.
    #[must_use]
    pub fn new() -> Self {
        let os = Os::current();
        let mut search_dirs: Vec<PathBuf> = Brew::default().bin_dir().into_iter().collect();
        if let Some(home) = dirs::home_dir() {
            search_dirs.extend(shim_dirs(&home, os));
        }
        Self {
            use_path: true,
            search_dirs,
            os,
            runner: Arc::new(SystemRunner),
        }
    }

    /// Replace the non-`PATH` search directories.
    #[must_use]
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Skip the `PATH` lookup.
    #[must_use]
    pub fn without_path(mut self) -> Self {
        self.use_path = false;
        self
    }

    /// Run commands through `runner`.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Directories searched after `PATH`.
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// First candidate for `tool`: `PATH`, then the search directories.
    #[must_use]
    pub fn resolve(&self, tool: &str) -> Option<PathBuf> {
        if self.use_path
            && let Ok(path) = which::which(tool)
        {
            return Some(path);
        }
        let file_name = executable_name(tool, self.os);
        self.search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    fn not_found(&self, tool: &str) -> Error {
        let mut tried = Vec::new();
        if self.use_path {
            tried.push("PATH".to_string());
        }
        tried.extend(self.search_dirs.iter().map(|d| d.display().to_string()));
        Error::NotFound {
            tool: tool.to_string(),
            tried: Avenues::new(tried),
            remediation: Remediation::new(vec![format!(
                "install '{tool}' and make sure it is on PATH"
            )]),
        }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn is_available(&self, tool: &str) -> bool {
        self.resolve(tool).is_some()
    }

    async fn execute(&self, options: &ExecOptions) -> Result<ExecResult> {
        let program = self
            .resolve(&options.tool)
            .ok_or_else(|| self.not_found(&options.tool))?;
        debug!(tool = %options.tool, path = %program.display(), "Running locally");

        let mut spec = CommandSpec::new(program.to_string_lossy()).args(options.args.iter().cloned());
        if let Some(dir) = &options.work_dir {
            spec = spec.current_dir(dir);
        }
        for (key, value) in &options.env {
            spec = spec.env(key, value);
        }
        if let Some(input) = &options.stdin {
            spec = spec.stdin(input.clone());
        }

        let output = self.runner.run(&spec, &options.cancel).await?;
        Ok(ExecResult::from_output(output, self.name()))
    }
}

impl std::fmt::Debug for LocalExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalExecutor")
            .field("use_path", &self.use_path)
            .field("search_dirs", &self.search_dirs)
            .field("os", &self.os)
            .finish_non_exhaustive()
    }
}

//! Auto-mode routing between local and container executors.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tooldock_core::ci::CI_VARS;
use tooldock_core::{Error, Result};
use tooldock_exec::{
    AutoExecutor, ExecOptions, ExecResult, ExecutionMode, ExecutionRouter, Executor,
};

/// Executor answering availability from a fixed tool list.
struct FakeExecutor {
    name: &'static str,
    tools: Vec<&'static str>,
    runs: Mutex<Vec<String>>,
}

impl FakeExecutor {
    fn new(name: &'static str, tools: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            name,
            tools: tools.to_vec(),
            runs: Mutex::default(),
        })
    }

    fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_available(&self, tool: &str) -> bool {
        self.tools.contains(&tool)
    }

    async fn execute(&self, options: &ExecOptions) -> Result<ExecResult> {
        self.runs.lock().unwrap().push(options.tool.clone());
        Ok(ExecResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            executor: self.name.to_string(),
        })
    }
}

/// Every CI variable cleared, plus `set`.
fn ci_env(set: Option<(&'static str, &'static str)>) -> Vec<(&'static str, Option<&'static str>)> {
    let mut vars: Vec<_> = CI_VARS
        .iter()
        .chain(std::iter::once(&"CI"))
        .map(|var| (*var, None))
        .collect();
    if let Some((key, value)) = set {
        for entry in &mut vars {
            if entry.0 == key {
                entry.1 = Some(value);
            }
        }
    }
    vars
}

#[tokio::test]
async fn test_ci_prefers_docker_even_when_local_exists() {
    let local = FakeExecutor::new("local", &["shellcheck"]);
    let docker = FakeExecutor::new("docker", &["shellcheck"]);
    let auto = AutoExecutor::new(local.clone(), docker.clone());

    let result = temp_env::async_with_vars(ci_env(Some(("GITHUB_ACTIONS", "true"))), async {
        auto.execute(&ExecOptions::new("shellcheck")).await
    })
    .await
    .unwrap();

    assert_eq!(result.executor, "docker");
    assert_eq!(docker.runs(), vec!["shellcheck"]);
    assert!(local.runs().is_empty());
}

#[tokio::test]
async fn test_outside_ci_prefers_local() {
    let local = FakeExecutor::new("local", &["shellcheck"]);
    let docker = FakeExecutor::new("docker", &["shellcheck"]);
    let auto = AutoExecutor::new(local.clone(), docker.clone());

    let result = temp_env::async_with_vars(ci_env(None), async {
        auto.execute(&ExecOptions::new("shellcheck")).await
    })
    .await
    .unwrap();

    assert_eq!(result.executor, "local");
}

#[tokio::test]
async fn test_ci_falls_back_to_local_for_tools_outside_image() {
    let local = FakeExecutor::new("local", &["terraform"]);
    let docker = FakeExecutor::new("docker", &["shellcheck"]);
    let auto = AutoExecutor::new(local, docker).with_ci(true);

    let result = auto.execute(&ExecOptions::new("terraform")).await.unwrap();
    assert_eq!(result.executor, "local");
}

#[tokio::test]
async fn test_docker_is_the_fallback_locally() {
    let local = FakeExecutor::new("local", &[]);
    let docker = FakeExecutor::new("docker", &["hadolint"]);
    let auto = AutoExecutor::new(local, docker).with_ci(false);

    let result = auto.execute(&ExecOptions::new("hadolint")).await.unwrap();
    assert_eq!(result.executor, "docker");
}

#[tokio::test]
async fn test_no_executor_names_three_remedies() {
    let auto = AutoExecutor::new(FakeExecutor::new("local", &[]), FakeExecutor::new("docker", &[]))
        .with_ci(false)
        .with_image("podman", "ghcr.io/acme/tools:2");

    assert!(!auto.is_available("yamllint").await);
    let err = auto
        .execute(&ExecOptions::new("yamllint"))
        .await
        .unwrap_err();

    let Error::NoExecutor { remediation, .. } = &err else {
        panic!("expected NoExecutor, got {err:?}");
    };
    let steps = remediation.suggestions();
    assert_eq!(steps.len(), 3);
    assert!(steps[0].contains("install 'yamllint'"));
    assert!(steps[1].contains("TOOLDOCK_EXEC_MODE"));
    assert!(steps[2].contains("podman pull ghcr.io/acme/tools:2"));
}

#[tokio::test]
async fn test_router_dispatches_by_mode() {
    let local = FakeExecutor::new("local", &["jq"]);
    let docker = FakeExecutor::new("docker", &["jq"]);

    let forced = ExecutionRouter::new(ExecutionMode::Docker, local.clone(), docker.clone());
    let result = forced.execute(&ExecOptions::new("jq")).await.unwrap();
    assert_eq!(result.executor, "docker");

    let auto = ExecutionRouter::new(ExecutionMode::Auto, local.clone(), docker.clone())
        .with_auto(AutoExecutor::new(local, docker).with_ci(false));
    let result = auto.execute(&ExecOptions::new("jq")).await.unwrap();
    assert_eq!(result.executor, "local");
}

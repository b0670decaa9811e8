//! CI environment detection.

/// Provider-specific variables whose mere presence means "running in CI".
pub const CI_VARS: &[&str] = &[
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "CIRCLECI",
    "TRAVIS",
    "BITBUCKET_PIPELINES",
    "AZURE_PIPELINES",
    "TF_BUILD",
    "DRONE",
    "TEAMCITY_VERSION",
];

/// Check if the current process is running in a CI environment.
///
/// `CI` counts when set to a truthy value (non-empty, not `0`, not `false`);
/// any of [`CI_VARS`] counts when set at all.
#[must_use]
pub fn is_ci() -> bool {
    is_ci_with(|var| std::env::var(var).ok())
}

/// [`is_ci`] against an arbitrary variable lookup.
pub fn is_ci_with<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if lookup("CI").is_some_and(|v| is_truthy(&v)) {
        return true;
    }
    CI_VARS.iter().any(|var| lookup(var).is_some())
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

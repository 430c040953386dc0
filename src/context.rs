//! Immutable run context constructed once at process start.
//!
//! Every component that needs CI metadata (event name, repository, PR number,
//! tokens, output file paths) receives a [`RunContext`] by parameter instead
//! of reading the process environment. `RunContext::from_env` is the single
//! place the environment is consulted.

use std::env;
use std::path::PathBuf;

/// Fallback commit id when no revision can be resolved
pub const UNKNOWN_COMMIT: &str = "unknown";

/// Immutable snapshot of the CI environment for one invocation
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Event that triggered the run ("push", "pull_request", ...)
    pub event_name: String,
    /// Full git ref of the run (e.g. "refs/pull/12/merge")
    pub ref_name: String,
    /// Repository slug ("owner/name")
    pub repository: String,
    /// Commit id under test
    pub commit: String,
    /// Pull request number, when the event carries one
    pub pr_number: Option<u64>,
    /// Base branch of the pull request, when the event carries one
    pub pr_base_branch: Option<String>,
    /// Identifier of the current workflow run
    pub run_id: Option<u64>,
    /// Display name of the running workflow
    pub workflow_name: String,
    /// Workflow ref ("owner/repo/.github/workflows/size.yml@refs/...")
    pub workflow_ref: String,
    /// REST API token
    pub token: String,
    /// REST API base URL
    pub api_base: String,
    /// Actions runtime URL for artifact upload
    pub runtime_url: Option<String>,
    /// Actions runtime token for artifact upload
    pub runtime_token: Option<String>,
    /// Path of the job-outputs file, when the runner provides one
    pub output_path: Option<PathBuf>,
    /// Path of the job-summary file, when the runner provides one
    pub summary_path: Option<PathBuf>,
    /// Per-invocation temp root for sandbox directories
    pub temp_root: PathBuf,
}

impl RunContext {
    /// Build the context from the process environment.
    ///
    /// Missing optional values become `None`; a missing commit becomes
    /// [`UNKNOWN_COMMIT`]. This is the only function in the crate that reads
    /// environment variables.
    pub fn from_env() -> Self {
        Self {
            event_name: var_or("GITHUB_EVENT_NAME", "local"),
            ref_name: var_or("GITHUB_REF", ""),
            repository: var_or("GITHUB_REPOSITORY", ""),
            commit: var_or("GITHUB_SHA", UNKNOWN_COMMIT),
            pr_number: parse_var("SIZEGATE_PR_NUMBER")
                .or_else(|| pr_number_from_ref(&var_or("GITHUB_REF", ""))),
            pr_base_branch: env::var("GITHUB_BASE_REF").ok().filter(|v| !v.is_empty()),
            run_id: parse_var("GITHUB_RUN_ID"),
            workflow_name: var_or("GITHUB_WORKFLOW", ""),
            workflow_ref: var_or("GITHUB_WORKFLOW_REF", ""),
            token: var_or("GITHUB_TOKEN", ""),
            api_base: var_or("GITHUB_API_URL", "https://api.github.com"),
            runtime_url: env::var("ACTIONS_RUNTIME_URL").ok().filter(|v| !v.is_empty()),
            runtime_token: env::var("ACTIONS_RUNTIME_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            output_path: env::var("GITHUB_OUTPUT").ok().map(PathBuf::from),
            summary_path: env::var("GITHUB_STEP_SUMMARY").ok().map(PathBuf::from),
            temp_root: env::var("RUNNER_TEMP")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
        }
    }

    /// Whether this run should publish a new baseline (trunk build)
    pub fn is_trunk_build(&self) -> bool {
        self.event_name == "push"
    }

    /// File name of the current workflow, derived from the workflow ref.
    ///
    /// `"octo/app/.github/workflows/size.yml@refs/heads/main"` resolves to
    /// `"size.yml"`. Returns `None` when the ref is absent or malformed.
    pub fn workflow_file_name(&self) -> Option<String> {
        let path = self.workflow_ref.split('@').next()?;
        let name = path.rsplit('/').next()?;
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Candidate branches for baseline lookup, in priority order.
    ///
    /// The configured branches come first; the PR base branch is appended
    /// when present and not already listed.
    pub fn candidate_branches(&self, configured: &[String]) -> Vec<String> {
        let mut branches: Vec<String> = Vec::new();
        if let Some(base) = &self.pr_base_branch {
            branches.push(base.clone());
        }
        for branch in configured {
            if !branches.contains(branch) {
                branches.push(branch.clone());
            }
        }
        branches
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Extract the pull request number from a `refs/pull/<n>/merge` ref
fn pr_number_from_ref(ref_name: &str) -> Option<u64> {
    let rest = ref_name.strip_prefix("refs/pull/")?;
    rest.split('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_context() -> RunContext {
        RunContext {
            event_name: "pull_request".to_string(),
            ref_name: "refs/pull/12/merge".to_string(),
            repository: "octo/app".to_string(),
            commit: "abc1234".to_string(),
            pr_number: Some(12),
            pr_base_branch: Some("main".to_string()),
            run_id: Some(42),
            workflow_name: "size".to_string(),
            workflow_ref: "octo/app/.github/workflows/size.yml@refs/pull/12/merge".to_string(),
            token: "t0ken".to_string(),
            api_base: "https://api.github.com".to_string(),
            runtime_url: None,
            runtime_token: None,
            output_path: None,
            summary_path: None,
            temp_root: Path::new("/tmp").to_path_buf(),
        }
    }

    #[test]
    fn test_workflow_file_name_derived_from_ref() {
        let ctx = test_context();
        assert_eq!(ctx.workflow_file_name().as_deref(), Some("size.yml"));
    }

    #[test]
    fn test_workflow_file_name_missing_ref_is_none() {
        let mut ctx = test_context();
        ctx.workflow_ref = String::new();
        assert_eq!(ctx.workflow_file_name(), None);
    }

    #[test]
    fn test_candidate_branches_base_branch_first_no_duplicates() {
        let ctx = test_context();
        let branches =
            ctx.candidate_branches(&["main".to_string(), "develop".to_string()]);
        assert_eq!(branches, vec!["main".to_string(), "develop".to_string()]);
    }

    #[test]
    fn test_candidate_branches_without_pr_base_uses_configured() {
        let mut ctx = test_context();
        ctx.pr_base_branch = None;
        let branches = ctx.candidate_branches(&["main".to_string()]);
        assert_eq!(branches, vec!["main".to_string()]);
    }

    #[test]
    fn test_pr_number_parsed_from_pull_ref() {
        assert_eq!(super::pr_number_from_ref("refs/pull/12/merge"), Some(12));
        assert_eq!(super::pr_number_from_ref("refs/heads/main"), None);
        assert_eq!(super::pr_number_from_ref("refs/pull/abc/merge"), None);
    }

    #[test]
    fn test_is_trunk_build_only_for_push() {
        let mut ctx = test_context();
        assert!(!ctx.is_trunk_build());
        ctx.event_name = "push".to_string();
        assert!(ctx.is_trunk_build());
    }
}

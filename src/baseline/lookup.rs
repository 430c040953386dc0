//! Remote baseline lookup.
//!
//! Two-phase search: a cheap targeted walk of the current workflow's recent
//! runs on each candidate branch, then a bounded repository-wide artifact
//! scan. The most relevant baseline is the first match in branch-priority
//! then recency order, not the newest by wall clock across branches.

use log::{info, warn};
use std::time::Duration;

use crate::context::RunContext;
use crate::remote::retry::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY};
use crate::remote::{with_retry, Artifact, ArtifactStore, RemoteError};

use super::BASELINE_ARTIFACT_NAME;

/// Workflow runs fetched per candidate branch on the targeted path
pub const RUNS_PER_BRANCH: u32 = 30;

/// Locates the most relevant baseline artifact in the remote store
pub struct BaselineFinder<'a, S: ArtifactStore> {
    store: &'a S,
    ctx: &'a RunContext,
    attempts: u32,
    base_delay: Duration,
}

impl<'a, S: ArtifactStore> BaselineFinder<'a, S> {
    /// Create a finder with the default retry policy
    pub fn new(store: &'a S, ctx: &'a RunContext) -> Self {
        Self::with_policy(store, ctx, DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY)
    }

    /// Create a finder with an explicit retry policy
    pub fn with_policy(
        store: &'a S,
        ctx: &'a RunContext,
        attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            store,
            ctx,
            attempts,
            base_delay,
        }
    }

    /// Find the most relevant non-expired baseline artifact.
    ///
    /// Remote failures on either phase degrade to `None`: a stale or
    /// unreachable baseline must not block the pipeline.
    pub fn find_baseline(
        &self,
        candidate_branches: &[String],
        search_page_budget: u32,
    ) -> Option<Artifact> {
        match self.targeted_search(candidate_branches) {
            Ok(Some(artifact)) => return Some(artifact),
            Ok(None) => {}
            Err(err) => warn!("Targeted baseline search failed: {}", err),
        }

        match self.paginated_scan(candidate_branches, search_page_budget) {
            Ok(found) => found,
            Err(err) => {
                warn!("Repository-wide artifact scan failed: {}", err);
                None
            }
        }
    }

    /// Resolve the current workflow's id by ref-derived file name, falling
    /// back to a name lookup. Ambiguous name matches take the first with a
    /// warning; no match resolves to `None`.
    fn resolve_workflow_id(&self) -> Result<Option<u64>, RemoteError> {
        let workflows = self.retry(|| self.store.list_workflows())?;

        if let Some(file_name) = self.ctx.workflow_file_name() {
            if let Some(workflow) = workflows
                .iter()
                .find(|w| w.path.rsplit('/').next() == Some(file_name.as_str()))
            {
                return Ok(Some(workflow.id));
            }
        }

        let mut named = workflows
            .iter()
            .filter(|w| w.name == self.ctx.workflow_name);
        let first = named.next();
        if first.is_some() && named.next().is_some() {
            warn!(
                "Multiple workflows named '{}', using the first match",
                self.ctx.workflow_name
            );
        }
        Ok(first.map(|w| w.id))
    }

    /// Walk recent runs of the current workflow per candidate branch
    fn targeted_search(
        &self,
        candidate_branches: &[String],
    ) -> Result<Option<Artifact>, RemoteError> {
        let Some(workflow_id) = self.resolve_workflow_id()? else {
            info!("Could not resolve the current workflow, scanning all artifacts");
            return Ok(None);
        };

        for branch in candidate_branches {
            let runs =
                self.retry(|| self.store.list_workflow_runs(workflow_id, branch, RUNS_PER_BRANCH))?;
            for run in runs {
                let artifacts = self.retry(|| self.store.list_run_artifacts(run.id))?;
                if let Some(artifact) = artifacts
                    .into_iter()
                    .find(|a| !a.expired && a.name == BASELINE_ARTIFACT_NAME)
                {
                    info!(
                        "Found baseline artifact {} on branch {} (run {})",
                        artifact.id, branch, run.id
                    );
                    return Ok(Some(artifact));
                }
            }
        }

        Ok(None)
    }

    /// Page through the repository-wide listing up to the page budget
    fn paginated_scan(
        &self,
        candidate_branches: &[String],
        search_page_budget: u32,
    ) -> Result<Option<Artifact>, RemoteError> {
        let mut scanned: usize = 0;

        for page in 1..=search_page_budget {
            let listing = self.retry(|| self.store.artifacts_page(page))?;
            scanned += listing.artifacts.len();

            for artifact in listing.artifacts {
                if artifact.expired || artifact.name != BASELINE_ARTIFACT_NAME {
                    continue;
                }
                let branch_matches = artifact
                    .workflow_run
                    .as_ref()
                    .and_then(|run| run.head_branch.as_deref())
                    .map(|branch| candidate_branches.iter().any(|c| c == branch))
                    .unwrap_or(false);
                if branch_matches {
                    info!("Found baseline artifact {} on page {}", artifact.id, page);
                    return Ok(Some(artifact));
                }
            }

            if listing.done {
                info!(
                    "Exhausted artifact listing after {} page(s), no baseline found",
                    page
                );
                return Ok(None);
            }
        }

        warn!(
            "No baseline found after scanning {} page(s) ({} artifacts). \
             Raise max-artifact-pages to search further back",
            search_page_budget, scanned
        );
        Ok(None)
    }

    fn retry<T>(
        &self,
        op: impl FnMut() -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        with_retry(self.attempts, self.base_delay, op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::api::{ArtifactPage, ARTIFACTS_PER_PAGE};
    use crate::remote::types::{ArtifactRun, IssueComment, Workflow, WorkflowRun};
    use parking_lot::Mutex;
    use std::path::Path;

    fn transport_error() -> RemoteError {
        RemoteError::Status {
            status: 500,
            url: "http://test".to_string(),
        }
    }

    fn baseline_artifact(id: u64, branch: &str) -> Artifact {
        Artifact {
            id,
            name: BASELINE_ARTIFACT_NAME.to_string(),
            expired: false,
            size_in_bytes: 100,
            workflow_run: Some(ArtifactRun {
                id: Some(id),
                head_branch: Some(branch.to_string()),
            }),
        }
    }

    /// Scripted store: listings are configured per test
    #[derive(Default)]
    struct StubStore {
        workflows: Vec<Workflow>,
        workflows_fail: bool,
        runs: Vec<(String, Vec<WorkflowRun>)>,
        runs_fail: bool,
        run_artifacts: Vec<(u64, Vec<Artifact>)>,
        pages: Vec<Vec<Artifact>>,
        page_calls: Mutex<u32>,
    }

    impl ArtifactStore for StubStore {
        fn list_workflows(&self) -> Result<Vec<Workflow>, RemoteError> {
            if self.workflows_fail {
                return Err(transport_error());
            }
            Ok(self.workflows.clone())
        }

        fn list_workflow_runs(
            &self,
            _workflow_id: u64,
            branch: &str,
            _limit: u32,
        ) -> Result<Vec<WorkflowRun>, RemoteError> {
            if self.runs_fail {
                return Err(transport_error());
            }
            Ok(self
                .runs
                .iter()
                .find(|(b, _)| b == branch)
                .map(|(_, runs)| runs.clone())
                .unwrap_or_default())
        }

        fn list_run_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, RemoteError> {
            Ok(self
                .run_artifacts
                .iter()
                .find(|(id, _)| *id == run_id)
                .map(|(_, artifacts)| artifacts.clone())
                .unwrap_or_default())
        }

        fn artifacts_page(&self, page: u32) -> Result<ArtifactPage, RemoteError> {
            *self.page_calls.lock() += 1;
            let index = (page - 1) as usize;
            let artifacts = self.pages.get(index).cloned().unwrap_or_default();
            let done = index + 1 >= self.pages.len()
                || (artifacts.len() as u32) < ARTIFACTS_PER_PAGE;
            Ok(ArtifactPage { artifacts, done })
        }

        fn download_artifact(&self, _artifact_id: u64) -> Result<Vec<u8>, RemoteError> {
            unimplemented!("not used by lookup")
        }

        fn upload_artifact(
            &self,
            _name: &str,
            _files: &[&Path],
            _retention_days: u32,
        ) -> Result<(), RemoteError> {
            unimplemented!("not used by lookup")
        }

        fn list_comments(&self, _pr: u64, _page: u32) -> Result<Vec<IssueComment>, RemoteError> {
            unimplemented!("not used by lookup")
        }

        fn create_comment(&self, _pr: u64, _body: &str) -> Result<(), RemoteError> {
            unimplemented!("not used by lookup")
        }

        fn update_comment(&self, _comment_id: u64, _body: &str) -> Result<(), RemoteError> {
            unimplemented!("not used by lookup")
        }
    }

    fn ctx() -> RunContext {
        RunContext {
            event_name: "pull_request".to_string(),
            ref_name: "refs/pull/12/merge".to_string(),
            repository: "octo/app".to_string(),
            commit: "abc".to_string(),
            pr_number: Some(12),
            pr_base_branch: Some("main".to_string()),
            run_id: Some(42),
            workflow_name: "size".to_string(),
            workflow_ref: "octo/app/.github/workflows/size.yml@refs/pull/12/merge".to_string(),
            token: String::new(),
            api_base: String::new(),
            runtime_url: None,
            runtime_token: None,
            output_path: None,
            summary_path: None,
            temp_root: std::env::temp_dir(),
        }
    }

    fn finder<'a>(store: &'a StubStore, ctx: &'a RunContext) -> BaselineFinder<'a, StubStore> {
        BaselineFinder::with_policy(store, ctx, 1, Duration::ZERO)
    }

    fn size_workflow() -> Workflow {
        Workflow {
            id: 10,
            name: "size".to_string(),
            path: ".github/workflows/size.yml".to_string(),
        }
    }

    #[test]
    fn test_targeted_search_finds_baseline_on_first_branch() {
        let store = StubStore {
            workflows: vec![size_workflow()],
            runs: vec![(
                "main".to_string(),
                vec![WorkflowRun {
                    id: 1,
                    head_branch: Some("main".to_string()),
                }],
            )],
            run_artifacts: vec![(1, vec![baseline_artifact(77, "main")])],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx)
            .find_baseline(&["main".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 77);
        assert_eq!(*store.page_calls.lock(), 0, "fallback should not run");
    }

    #[test]
    fn test_branch_priority_wins_over_recency() {
        // develop has a baseline on an older run; main (higher priority)
        // also has one. The main artifact must win.
        let store = StubStore {
            workflows: vec![size_workflow()],
            runs: vec![
                (
                    "main".to_string(),
                    vec![WorkflowRun {
                        id: 1,
                        head_branch: Some("main".to_string()),
                    }],
                ),
                (
                    "develop".to_string(),
                    vec![WorkflowRun {
                        id: 2,
                        head_branch: Some("develop".to_string()),
                    }],
                ),
            ],
            run_artifacts: vec![
                (1, vec![baseline_artifact(100, "main")]),
                (2, vec![baseline_artifact(200, "develop")]),
            ],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx)
            .find_baseline(&["main".to_string(), "develop".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 100);
    }

    #[test]
    fn test_expired_artifacts_are_skipped() {
        let mut expired = baseline_artifact(50, "main");
        expired.expired = true;
        let store = StubStore {
            workflows: vec![size_workflow()],
            runs: vec![(
                "main".to_string(),
                vec![
                    WorkflowRun {
                        id: 1,
                        head_branch: Some("main".to_string()),
                    },
                    WorkflowRun {
                        id: 2,
                        head_branch: Some("main".to_string()),
                    },
                ],
            )],
            run_artifacts: vec![(1, vec![expired]), (2, vec![baseline_artifact(51, "main")])],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx)
            .find_baseline(&["main".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 51);
    }

    #[test]
    fn test_targeted_failure_falls_back_to_scan() {
        let store = StubStore {
            workflows: vec![size_workflow()],
            runs_fail: true,
            pages: vec![vec![baseline_artifact(7, "main")]],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx)
            .find_baseline(&["main".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 7);
    }

    #[test]
    fn test_unresolvable_workflow_skips_to_scan() {
        let store = StubStore {
            workflows: vec![Workflow {
                id: 99,
                name: "deploy".to_string(),
                path: ".github/workflows/deploy.yml".to_string(),
            }],
            pages: vec![vec![baseline_artifact(8, "main")]],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx)
            .find_baseline(&["main".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 8);
        assert_eq!(*store.page_calls.lock(), 1);
    }

    #[test]
    fn test_workflow_resolved_by_name_when_ref_missing() {
        let mut context = ctx();
        context.workflow_ref = String::new();
        let store = StubStore {
            workflows: vec![Workflow {
                id: 10,
                name: "size".to_string(),
                path: ".github/workflows/renamed.yml".to_string(),
            }],
            runs: vec![(
                "main".to_string(),
                vec![WorkflowRun {
                    id: 1,
                    head_branch: Some("main".to_string()),
                }],
            )],
            run_artifacts: vec![(1, vec![baseline_artifact(3, "main")])],
            ..StubStore::default()
        };

        let found = finder(&store, &context)
            .find_baseline(&["main".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 3);
    }

    #[test]
    fn test_scan_ignores_non_candidate_branches() {
        let store = StubStore {
            workflows_fail: true,
            pages: vec![vec![
                baseline_artifact(1, "feature/other"),
                baseline_artifact(2, "main"),
            ]],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx)
            .find_baseline(&["main".to_string()], 10)
            .unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn test_scan_respects_page_budget() {
        // 3 configured pages of non-matching artifacts but budget of 2
        let filler: Vec<Artifact> = (0..ARTIFACTS_PER_PAGE)
            .map(|i| Artifact {
                id: i as u64,
                name: "other-artifact".to_string(),
                expired: false,
                size_in_bytes: 1,
                workflow_run: None,
            })
            .collect();
        let store = StubStore {
            workflows_fail: true,
            pages: vec![filler.clone(), filler.clone(), vec![baseline_artifact(9, "main")]],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx).find_baseline(&["main".to_string()], 2);
        assert!(found.is_none());
        assert_eq!(*store.page_calls.lock(), 2);
    }

    #[test]
    fn test_exhausted_listing_returns_none_without_error() {
        let store = StubStore {
            workflows_fail: true,
            pages: vec![vec![]],
            ..StubStore::default()
        };
        let ctx = ctx();

        let found = finder(&store, &ctx).find_baseline(&["main".to_string()], 10);
        assert!(found.is_none());
        assert_eq!(*store.page_calls.lock(), 1, "stops at the final page");
    }

    #[test]
    fn test_everything_failing_degrades_to_none() {
        let store = StubStore {
            workflows_fail: true,
            runs_fail: true,
            ..StubStore::default()
        };
        let ctx = ctx();

        // pages default to empty => scan finds nothing; no panic, no error
        let found = finder(&store, &ctx).find_baseline(&["main".to_string()], 3);
        assert!(found.is_none());
    }
}

//! Capability trait for the remote artifact store.

use std::path::Path;
use thiserror::Error;

use super::types::{Artifact, IssueComment, Workflow, WorkflowRun};

/// Artifacts fetched per page on the repository-wide scan
pub const ARTIFACTS_PER_PAGE: u32 = 100;

/// Errors from the remote store boundary
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match any accepted shape
    #[error("failed to decode {context}: {source}")]
    Decode {
        /// What was being decoded
        context: String,
        #[source]
        /// Decode error source
        source: serde_json::Error,
    },

    /// Artifact upload requires the Actions runtime credentials
    #[error("artifact upload unavailable: missing {0}")]
    UploadUnavailable(String),

    /// Local I/O while staging an upload
    #[error("I/O error during {context}")]
    Io {
        /// What was being staged
        context: String,
        #[source]
        /// IO error source
        source: std::io::Error,
    },
}

/// One page of the repository-wide artifact listing
#[derive(Debug, Clone)]
pub struct ArtifactPage {
    /// Artifacts on this page
    pub artifacts: Vec<Artifact>,
    /// Whether this was the last page
    pub done: bool,
}

/// Authenticated access to the remote artifact/workflow store.
///
/// The lookup, extraction and publishing components consume this trait;
/// production code passes [`super::GithubStore`], tests pass an in-memory
/// implementation. All calls are synchronous and unretried — callers wrap
/// them in [`super::with_retry`] where the policy applies.
pub trait ArtifactStore {
    /// List the repository's workflow definitions
    fn list_workflows(&self) -> Result<Vec<Workflow>, RemoteError>;

    /// List recent runs of a workflow on a branch, most recent first
    fn list_workflow_runs(
        &self,
        workflow_id: u64,
        branch: &str,
        limit: u32,
    ) -> Result<Vec<WorkflowRun>, RemoteError>;

    /// List the artifacts produced by a workflow run
    fn list_run_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, RemoteError>;

    /// Fetch one page of the repository-wide artifact listing (1-based)
    fn artifacts_page(&self, page: u32) -> Result<ArtifactPage, RemoteError>;

    /// Download an artifact as a zip archive
    fn download_artifact(&self, artifact_id: u64) -> Result<Vec<u8>, RemoteError>;

    /// Upload files as a named artifact with a bounded retention period
    fn upload_artifact(
        &self,
        name: &str,
        files: &[&Path],
        retention_days: u32,
    ) -> Result<(), RemoteError>;

    /// Fetch one page of a pull request's comments (1-based)
    fn list_comments(&self, pr_number: u64, page: u32) -> Result<Vec<IssueComment>, RemoteError>;

    /// Create a new comment on a pull request
    fn create_comment(&self, pr_number: u64, body: &str) -> Result<(), RemoteError>;

    /// Replace the body of an existing comment
    fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), RemoteError>;
}

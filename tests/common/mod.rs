//! Shared test infrastructure: fixtures and an in-memory artifact store.

#![allow(dead_code)]

pub mod fixtures;

use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;

use sizegate::remote::api::{ArtifactPage, ArtifactStore, RemoteError, ARTIFACTS_PER_PAGE};
use sizegate::remote::types::{Artifact, ArtifactRun, IssueComment, Workflow, WorkflowRun};

/// One artifact held by the in-memory store
#[derive(Clone)]
pub struct StoredArtifact {
    pub id: u64,
    pub name: String,
    pub branch: String,
    pub expired: bool,
    pub files: Vec<(String, Vec<u8>)>,
}

/// In-memory artifact store covering the full capability surface.
///
/// Uploads are attributed to `upload_branch`, listings are served newest
/// first, and downloads are zipped on demand, so a publish → lookup →
/// extract round trip exercises the same data end to end.
pub struct InMemoryStore {
    pub upload_branch: String,
    pub artifacts: Mutex<Vec<StoredArtifact>>,
    pub comments: Mutex<Vec<(u64, String)>>,
    next_id: Mutex<u64>,
}

impl InMemoryStore {
    pub fn new(upload_branch: &str) -> Self {
        Self {
            upload_branch: upload_branch.to_string(),
            artifacts: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    pub fn push_artifact(&self, name: &str, branch: &str, expired: bool, files: Vec<(String, Vec<u8>)>) -> u64 {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        self.artifacts.lock().insert(
            0,
            StoredArtifact {
                id,
                name: name.to_string(),
                branch: branch.to_string(),
                expired,
                files,
            },
        );
        id
    }

    fn as_listing(&self) -> Vec<Artifact> {
        self.artifacts
            .lock()
            .iter()
            .map(|stored| Artifact {
                id: stored.id,
                name: stored.name.clone(),
                expired: stored.expired,
                size_in_bytes: stored.files.iter().map(|(_, b)| b.len() as u64).sum(),
                workflow_run: Some(ArtifactRun {
                    id: Some(stored.id),
                    head_branch: Some(stored.branch.clone()),
                }),
            })
            .collect()
    }
}

impl ArtifactStore for InMemoryStore {
    fn list_workflows(&self) -> Result<Vec<Workflow>, RemoteError> {
        // No workflows registered: the lookup falls through to the
        // repository-wide scan, which this store serves fully.
        Ok(Vec::new())
    }

    fn list_workflow_runs(
        &self,
        _workflow_id: u64,
        _branch: &str,
        _limit: u32,
    ) -> Result<Vec<WorkflowRun>, RemoteError> {
        Ok(Vec::new())
    }

    fn list_run_artifacts(&self, _run_id: u64) -> Result<Vec<Artifact>, RemoteError> {
        Ok(Vec::new())
    }

    fn artifacts_page(&self, page: u32) -> Result<ArtifactPage, RemoteError> {
        let listing = self.as_listing();
        let start = ((page - 1) * ARTIFACTS_PER_PAGE) as usize;
        let artifacts: Vec<Artifact> = listing
            .iter()
            .skip(start)
            .take(ARTIFACTS_PER_PAGE as usize)
            .cloned()
            .collect();
        let done = start + artifacts.len() >= listing.len();
        Ok(ArtifactPage { artifacts, done })
    }

    fn download_artifact(&self, artifact_id: u64) -> Result<Vec<u8>, RemoteError> {
        let artifacts = self.artifacts.lock();
        let stored = artifacts
            .iter()
            .find(|a| a.id == artifact_id)
            .ok_or(RemoteError::Status {
                status: 404,
                url: format!("memory://artifacts/{}", artifact_id),
            })?;

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, contents) in &stored.files {
            writer
                .start_file(name.as_str(), zip::write::SimpleFileOptions::default())
                .map_err(|_| RemoteError::Status {
                    status: 500,
                    url: "memory://zip".to_string(),
                })?;
            writer.write_all(contents).map_err(|source| RemoteError::Io {
                context: "zipping stored artifact".to_string(),
                source,
            })?;
        }
        let cursor = writer.finish().map_err(|_| RemoteError::Status {
            status: 500,
            url: "memory://zip".to_string(),
        })?;
        Ok(cursor.into_inner())
    }

    fn upload_artifact(
        &self,
        name: &str,
        files: &[&Path],
        _retention_days: u32,
    ) -> Result<(), RemoteError> {
        let mut staged = Vec::new();
        for file in files {
            let contents = std::fs::read(file).map_err(|source| RemoteError::Io {
                context: format!("reading {}", file.display()),
                source,
            })?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            staged.push((file_name, contents));
        }
        let branch = self.upload_branch.clone();
        self.push_artifact(name, &branch, false, staged);
        Ok(())
    }

    fn list_comments(&self, _pr: u64, page: u32) -> Result<Vec<IssueComment>, RemoteError> {
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(self
            .comments
            .lock()
            .iter()
            .map(|(id, body)| IssueComment {
                id: *id,
                body: Some(body.clone()),
            })
            .collect())
    }

    fn create_comment(&self, _pr: u64, body: &str) -> Result<(), RemoteError> {
        let mut comments = self.comments.lock();
        let id = comments.len() as u64 + 1;
        comments.push((id, body.to_string()));
        Ok(())
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), RemoteError> {
        let mut comments = self.comments.lock();
        if let Some(entry) = comments.iter_mut().find(|(id, _)| *id == comment_id) {
            entry.1 = body.to_string();
        }
        Ok(())
    }
}

//! Publishing the current measurement as the new baseline.
//!
//! Append-only: every publish creates a new artifact under the fixed name
//! and resolution of "the" baseline stays entirely with the lookup. Two
//! publishes of the same record yield equivalent content with distinct
//! identities.

use log::info;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::error::SizeGateError;
use crate::infra::{FileSystem, RealFileSystem};
use crate::remote::retry::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY};
use crate::remote::{with_retry, ArtifactStore};
use crate::stats::{BundleStats, STATS_FILE_NAME};

use super::{BASELINE_ARTIFACT_NAME, BASELINE_RETENTION_DAYS};

/// Uploads measurement records as baseline artifacts
pub struct BaselinePublisher<'a, S: ArtifactStore, FS: FileSystem = RealFileSystem> {
    store: &'a S,
    staging_root: PathBuf,
    attempts: u32,
    base_delay: Duration,
    fs: FS,
}

impl<'a, S: ArtifactStore> BaselinePublisher<'a, S, RealFileSystem> {
    /// Create a publisher with the default retry policy
    pub fn new(store: &'a S, staging_root: &std::path::Path) -> Self {
        Self::with_policy(store, staging_root, DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY)
    }

    /// Create a publisher with an explicit retry policy
    pub fn with_policy(
        store: &'a S,
        staging_root: &std::path::Path,
        attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            store,
            staging_root: staging_root.to_path_buf(),
            attempts,
            base_delay,
            fs: RealFileSystem,
        }
    }
}

impl<'a, S: ArtifactStore, FS: FileSystem> BaselinePublisher<'a, S, FS> {
    /// Serialize `stats` to the fixed record file name and upload it under
    /// the fixed baseline artifact name.
    pub fn publish(&self, stats: &BundleStats) -> Result<(), SizeGateError> {
        let staging = self.staging_root.join(format!("publish-{}", Uuid::new_v4()));
        self.fs
            .create_dir_all(&staging)
            .map_err(|source| SizeGateError::Io {
                context: format!("creating staging dir {}", staging.display()),
                source,
            })?;

        let record_path = staging.join(STATS_FILE_NAME);
        let contents = stats
            .to_json()
            .map_err(|source| SizeGateError::MalformedBaseline {
                name: STATS_FILE_NAME.to_string(),
                source,
            })?;
        self.fs
            .write(&record_path, contents)
            .map_err(|source| SizeGateError::Io {
                context: format!("writing {}", record_path.display()),
                source,
            })?;

        with_retry(self.attempts, self.base_delay, || {
            self.store.upload_artifact(
                BASELINE_ARTIFACT_NAME,
                &[record_path.as_path()],
                BASELINE_RETENTION_DAYS,
            )
        })?;

        info!(
            "Published baseline for commit {} ({} files, {} bytes raw)",
            stats.commit,
            stats.files.len(),
            stats.total_size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::api::{ArtifactPage, RemoteError};
    use crate::remote::types::{Artifact, IssueComment, Workflow, WorkflowRun};
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::TempDir;

    /// Store capturing uploaded record contents
    #[derive(Default)]
    struct UploadStore {
        uploads: Mutex<Vec<(String, String, u32)>>,
        fail_times: Mutex<u32>,
    }

    impl ArtifactStore for UploadStore {
        fn list_workflows(&self) -> Result<Vec<Workflow>, RemoteError> {
            unimplemented!("not used by publish")
        }

        fn list_workflow_runs(
            &self,
            _workflow_id: u64,
            _branch: &str,
            _limit: u32,
        ) -> Result<Vec<WorkflowRun>, RemoteError> {
            unimplemented!("not used by publish")
        }

        fn list_run_artifacts(&self, _run_id: u64) -> Result<Vec<Artifact>, RemoteError> {
            unimplemented!("not used by publish")
        }

        fn artifacts_page(&self, _page: u32) -> Result<ArtifactPage, RemoteError> {
            unimplemented!("not used by publish")
        }

        fn download_artifact(&self, _artifact_id: u64) -> Result<Vec<u8>, RemoteError> {
            unimplemented!("not used by publish")
        }

        fn upload_artifact(
            &self,
            name: &str,
            files: &[&Path],
            retention_days: u32,
        ) -> Result<(), RemoteError> {
            let mut failures = self.fail_times.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(RemoteError::Status {
                    status: 500,
                    url: "http://test".to_string(),
                });
            }
            let contents = std::fs::read_to_string(files[0]).map_err(|source| RemoteError::Io {
                context: "reading staged record".to_string(),
                source,
            })?;
            self.uploads
                .lock()
                .push((name.to_string(), contents, retention_days));
            Ok(())
        }

        fn list_comments(&self, _pr: u64, _page: u32) -> Result<Vec<IssueComment>, RemoteError> {
            unimplemented!("not used by publish")
        }

        fn create_comment(&self, _pr: u64, _body: &str) -> Result<(), RemoteError> {
            unimplemented!("not used by publish")
        }

        fn update_comment(&self, _comment_id: u64, _body: &str) -> Result<(), RemoteError> {
            unimplemented!("not used by publish")
        }
    }

    fn sample_stats() -> BundleStats {
        BundleStats::new(
            vec![crate::stats::FileStats {
                path: "app.js".to_string(),
                name: "app.js".to_string(),
                size: 1000,
                gzip: 400,
                brotli: 300,
            }],
            "abc".to_string(),
        )
    }

    #[test]
    fn test_publish_uploads_record_under_fixed_name() {
        let store = UploadStore::default();
        let temp_dir = TempDir::new().unwrap();
        let publisher = BaselinePublisher::with_policy(&store, temp_dir.path(), 1, Duration::ZERO);

        publisher.publish(&sample_stats()).unwrap();

        let uploads = store.uploads.lock();
        assert_eq!(uploads.len(), 1);
        let (name, contents, retention) = &uploads[0];
        assert_eq!(name, BASELINE_ARTIFACT_NAME);
        assert_eq!(*retention, BASELINE_RETENTION_DAYS);

        let loaded = BundleStats::from_json(contents).unwrap();
        assert_eq!(loaded.files, sample_stats().files);
        assert_eq!(loaded.commit, "abc");
        assert_eq!(loaded.total_size, 1000);
    }

    #[test]
    fn test_publish_twice_is_content_idempotent() {
        let store = UploadStore::default();
        let temp_dir = TempDir::new().unwrap();
        let publisher = BaselinePublisher::with_policy(&store, temp_dir.path(), 1, Duration::ZERO);

        let stats = sample_stats();
        publisher.publish(&stats).unwrap();
        publisher.publish(&stats).unwrap();

        let uploads = store.uploads.lock();
        assert_eq!(uploads.len(), 2, "each publish creates a new artifact");
        assert_eq!(uploads[0].1, uploads[1].1, "record content is identical");
    }

    #[test]
    fn test_publish_retries_transient_upload_failures() {
        let store = UploadStore {
            fail_times: Mutex::new(2),
            ..UploadStore::default()
        };
        let temp_dir = TempDir::new().unwrap();
        let publisher = BaselinePublisher::with_policy(&store, temp_dir.path(), 3, Duration::ZERO);

        publisher.publish(&sample_stats()).unwrap();
        assert_eq!(store.uploads.lock().len(), 1);
    }

    #[test]
    fn test_publish_exhausted_retries_propagates_error() {
        let store = UploadStore {
            fail_times: Mutex::new(5),
            ..UploadStore::default()
        };
        let temp_dir = TempDir::new().unwrap();
        let publisher = BaselinePublisher::with_policy(&store, temp_dir.path(), 3, Duration::ZERO);

        let err = publisher.publish(&sample_stats()).unwrap_err();
        assert!(matches!(err, SizeGateError::Remote(_)));
    }
}

//! Safe extraction of a downloaded baseline artifact.
//!
//! The archive comes from an eventually-consistent remote store and may be
//! stale, truncated or hostile. Extraction is sandboxed with two ceilings
//! (download size, cumulative decompressed size) and a per-entry
//! containment check. Only an oversized download or a malformed record is
//! a hard failure; everything else degrades to "no baseline".

use log::warn;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::SizeGateError;
use crate::remote::retry::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY};
use crate::remote::{with_retry, Artifact, ArtifactStore};
use crate::stats::{BundleStats, STATS_FILE_NAME};

/// Hard ceiling on the downloaded archive size
pub const MAX_ARCHIVE_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Ceiling on cumulative decompressed bytes across all entries
pub const MAX_UNZIPPED_BYTES: u64 = 200 * 1024 * 1024;

/// Downloads and extracts baseline artifacts into a sandbox directory
pub struct ArchiveExtractor<'a, S: ArtifactStore> {
    store: &'a S,
    sandbox_root: PathBuf,
    attempts: u32,
    base_delay: Duration,
}

impl<'a, S: ArtifactStore> ArchiveExtractor<'a, S> {
    /// Create an extractor with the default retry policy.
    ///
    /// `sandbox_root` is the per-invocation temp root; each extraction gets
    /// a fresh directory beneath it.
    pub fn new(store: &'a S, sandbox_root: &Path) -> Self {
        Self::with_policy(store, sandbox_root, DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY)
    }

    /// Create an extractor with an explicit retry policy
    pub fn with_policy(
        store: &'a S,
        sandbox_root: &Path,
        attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            store,
            sandbox_root: sandbox_root.to_path_buf(),
            attempts,
            base_delay,
        }
    }

    /// Download `artifact` and load the measurement record from it.
    ///
    /// Returns `Ok(None)` when the artifact is unusable (download failure,
    /// empty body, corrupt archive, zip-bomb abort, record file missing);
    /// a stale artifact must not block the pipeline. Fails hard only on an
    /// oversized download or a record that exists but cannot be parsed.
    pub fn load_baseline(&self, artifact: &Artifact) -> Result<Option<BundleStats>, SizeGateError> {
        let bytes = match with_retry(self.attempts, self.base_delay, || {
            self.store.download_artifact(artifact.id)
        }) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Failed to download baseline artifact {}: {}", artifact.id, err);
                return Ok(None);
            }
        };

        if bytes.len() as u64 > MAX_ARCHIVE_DOWNLOAD_BYTES {
            return Err(SizeGateError::ArtifactTooLarge {
                actual: bytes.len() as u64,
                limit: MAX_ARCHIVE_DOWNLOAD_BYTES,
            });
        }

        if bytes.is_empty() {
            warn!("Baseline artifact {} is empty, ignoring it", artifact.id);
            return Ok(None);
        }

        let sandbox = self.sandbox_root.join(format!("baseline-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&sandbox).map_err(|source| SizeGateError::Io {
            context: format!("creating sandbox {}", sandbox.display()),
            source,
        })?;

        if !extract_archive(&bytes, &sandbox)? {
            return Ok(None);
        }

        let record_path = sandbox.join(STATS_FILE_NAME);
        if !record_path.exists() {
            warn!(
                "Baseline artifact {} does not contain {}, ignoring it",
                artifact.id, STATS_FILE_NAME
            );
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&record_path).map_err(|source| SizeGateError::Io {
            context: format!("reading {}", record_path.display()),
            source,
        })?;

        let stats = BundleStats::from_json(&contents).map_err(|source| {
            SizeGateError::MalformedBaseline {
                name: STATS_FILE_NAME.to_string(),
                source,
            }
        })?;

        Ok(Some(stats))
    }
}

/// Unzip `bytes` into `sandbox`. Returns `Ok(false)` when extraction was
/// abandoned (corrupt archive or decompressed-size ceiling).
fn extract_archive(bytes: &[u8], sandbox: &Path) -> Result<bool, SizeGateError> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(err) => {
            warn!("Baseline archive is not a readable zip: {}", err);
            return Ok(false);
        }
    };

    // Declared sizes are checked before any entry is materialized: a single
    // huge entry and many small entries summing too large both abort here.
    let mut declared: u64 = 0;
    for index in 0..archive.len() {
        let entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Unreadable zip entry {}: {}", index, err);
                return Ok(false);
            }
        };
        declared = declared.saturating_add(entry.size());
        if declared > MAX_UNZIPPED_BYTES {
            warn!(
                "Baseline archive declares {} decompressed bytes, ceiling is {}; ignoring it",
                declared, MAX_UNZIPPED_BYTES
            );
            return Ok(false);
        }
    }

    // Budget enforced again on the actual decompressed stream, in case an
    // entry lies about its declared size.
    let mut remaining = MAX_UNZIPPED_BYTES;
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Unreadable zip entry {}: {}", index, err);
                return Ok(false);
            }
        };

        // Containment check: reject entries escaping the sandbox
        let Some(relative) = entry.enclosed_name() else {
            warn!(
                "Skipping zip entry with unsafe path: {}",
                entry.name()
            );
            continue;
        };
        let target = sandbox.join(relative);
        if !target.starts_with(sandbox) {
            warn!("Skipping zip entry resolving outside sandbox: {}", entry.name());
            continue;
        }

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|source| SizeGateError::Io {
                context: format!("creating {}", target.display()),
                source,
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SizeGateError::Io {
                context: format!("creating {}", parent.display()),
                source,
            })?;
        }

        let mut out = std::fs::File::create(&target).map_err(|source| SizeGateError::Io {
            context: format!("creating {}", target.display()),
            source,
        })?;
        let mut limited = (&mut entry).take(remaining + 1);
        let written = std::io::copy(&mut limited, &mut out).map_err(|source| SizeGateError::Io {
            context: format!("extracting {}", target.display()),
            source,
        })?;
        if written > remaining {
            warn!(
                "Baseline archive exceeded the {} byte decompression ceiling; ignoring it",
                MAX_UNZIPPED_BYTES
            );
            return Ok(false);
        }
        remaining -= written;
    }

    Ok(true)
}

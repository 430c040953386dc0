//! The measurement record: one immutable snapshot of a build's output.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::UNKNOWN_COMMIT;

/// Fixed record file name inside the baseline artifact archive
pub const STATS_FILE_NAME: &str = "bundle-stats.json";

/// Per-file measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    /// Path relative to the output directory, unique within a record
    pub path: String,
    /// Base file name
    pub name: String,
    /// Raw byte size
    pub size: u64,
    /// Gzip-compressed byte size
    pub gzip: u64,
    /// Brotli-compressed byte size
    pub brotli: u64,
}

/// Immutable snapshot of a build's output sizes.
///
/// Totals are always recomputed from `files`, never mutated independently;
/// deserialization re-derives them so a tampered record cannot carry
/// inconsistent sums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleStats {
    /// Measured files, ordered by path
    pub files: Vec<FileStats>,
    /// Sum of per-file raw sizes
    pub total_size: u64,
    /// Sum of per-file gzip sizes
    pub total_gzip: u64,
    /// Sum of per-file brotli sizes
    pub total_brotli: u64,
    /// Creation instant, seconds since the Unix epoch (informational)
    pub timestamp: u64,
    /// Revision the build was produced from, "unknown" if unavailable
    pub commit: String,
}

impl BundleStats {
    /// Build a record from per-file entries, sorting by path and deriving
    /// the totals.
    pub fn new(mut files: Vec<FileStats>, commit: String) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut stats = Self {
            files,
            total_size: 0,
            total_gzip: 0,
            total_brotli: 0,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            commit: if commit.is_empty() {
                UNKNOWN_COMMIT.to_string()
            } else {
                commit
            },
        };
        stats.recompute_totals();
        stats
    }

    /// Re-derive the aggregate fields from `files`
    pub fn recompute_totals(&mut self) {
        self.total_size = self.files.iter().map(|f| f.size).sum();
        self.total_gzip = self.files.iter().map(|f| f.gzip).sum();
        self.total_brotli = self.files.iter().map(|f| f.brotli).sum();
    }

    /// Parse a record from its JSON form, re-deriving the totals
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let mut stats: Self = serde_json::from_str(contents)?;
        stats.recompute_totals();
        Ok(stats)
    }

    /// Serialize the record to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

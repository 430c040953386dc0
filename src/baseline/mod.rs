//! Baseline resolution, extraction and publishing.
//!
//! A baseline is the most recently published measurement record for a
//! branch lineage. [`lookup`] locates its artifact in the remote store,
//! [`archive`] turns the downloaded archive into a record, and
//! [`publish`] uploads a new one on trunk builds.

pub mod archive;
pub mod lookup;
pub mod publish;

pub use archive::ArchiveExtractor;
pub use lookup::BaselineFinder;
pub use publish::BaselinePublisher;

/// Fixed name of the baseline artifact in the remote store
pub const BASELINE_ARTIFACT_NAME: &str = "sizegate-baseline";

/// Retention period requested for published baselines
pub const BASELINE_RETENTION_DAYS: u32 = 90;

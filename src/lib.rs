#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! sizegate library
//!
//! This library provides the core functionality for tracking build-output
//! size across commits in CI: measuring compiled assets, resolving a
//! previously stored baseline from the remote artifact store, and gating
//! merges on size budgets. It can be used programmatically in addition to
//! the CLI interface.
//!
//! # Basic Example
//!
//! Diffing two measurements:
//!
//! ```
//! use sizegate::config::GateConfig;
//! use sizegate::diff::{diff, Status};
//! use sizegate::stats::{BundleStats, FileStats};
//!
//! let baseline = BundleStats::new(
//!     vec![FileStats {
//!         path: "app.js".to_string(),
//!         name: "app.js".to_string(),
//!         size: 100_000,
//!         gzip: 40_000,
//!         brotli: 35_000,
//!     }],
//!     "abc123".to_string(),
//! );
//! let current = BundleStats::new(
//!     vec![FileStats {
//!         path: "app.js".to_string(),
//!         name: "app.js".to_string(),
//!         size: 101_000,
//!         gzip: 40_500,
//!         brotli: 35_400,
//!     }],
//!     "def456".to_string(),
//! );
//!
//! let result = diff(Some(&baseline), &current, &GateConfig::default());
//! assert_eq!(result.status, Status::Pass);
//! assert_eq!(result.diff_brotli, 400);
//! ```
//!
//! # Advanced Example: Budget Gating
//!
//! A configured budget turns growth into a failing status:
//!
//! ```
//! use sizegate::config::GateConfig;
//! use sizegate::diff::{diff, Status};
//! use sizegate::stats::{BundleStats, FileStats};
//!
//! let file = |gzip| FileStats {
//!     path: "app.js".to_string(),
//!     name: "app.js".to_string(),
//!     size: 0,
//!     gzip,
//!     brotli: 0,
//! };
//! let baseline = BundleStats::new(vec![file(100_000)], "abc".to_string());
//! let current = BundleStats::new(vec![file(105_000)], "def".to_string());
//!
//! let config = GateConfig {
//!     gzip: true,
//!     brotli: false,
//!     budget_max_increase_kb: Some(4.0),
//!     ..GateConfig::default()
//! };
//!
//! // 5000 bytes is 4.88 KB, over the 4 KB budget
//! let result = diff(Some(&baseline), &current, &config);
//! assert_eq!(result.status, Status::Fail);
//! ```

/// Baseline resolution, extraction and publishing
pub mod baseline;
/// Build command execution with timeout
pub mod build;
/// Command handlers for CLI operations
pub mod cmd;
/// Configuration file and threshold settings
pub mod config;
/// Immutable CI run context
pub mod context;
/// The size diff and threshold engine
pub mod diff;
/// Enhanced error types with contextual suggestions
pub mod error;
/// Shared formatting utilities
pub mod fmt;
/// Git metadata utilities
pub mod git;
/// Infrastructure traits for filesystem and command execution
pub mod infra;
/// Remote artifact store access
pub mod remote;
/// Report rendering and delivery
pub mod report;
/// Build-output measurement
pub mod stats;

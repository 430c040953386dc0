//! Command handlers for the sizegate CLI
//!
//! This module contains all command implementations, organized by
//! functionality. Each submodule handles a specific CLI command.

pub mod check;
pub mod completions;
pub mod measure;
pub mod publish;

pub use check::cmd_check;
pub use completions::cmd_completions;
pub use measure::cmd_measure;
pub use publish::cmd_publish;

use std::path::PathBuf;

use crate::config::GateConfig;
use crate::context::RunContext;
use crate::git::GitRepository;

/// CLI flags layered over the configuration file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit output directory
    pub output_dir: Option<PathBuf>,
    /// Aggregate budget (KB)
    pub budget_max_increase_kb: Option<f64>,
    /// Per-file warn threshold (KB)
    pub warn_above_kb: Option<f64>,
    /// Per-file fail threshold (KB)
    pub fail_above_kb: Option<f64>,
    /// Page budget for the repository-wide scan
    pub max_artifact_pages: Option<u32>,
    /// Candidate baseline branches
    pub branches: Option<Vec<String>>,
    /// Disable gzip measurement/comparison
    pub no_gzip: bool,
    /// Disable brotli measurement/comparison
    pub no_brotli: bool,
    /// Skip the configured build command
    pub skip_build: bool,
}

impl CliOverrides {
    /// Layer these flags over `config`, then re-sanitize and validate
    pub fn apply(&self, config: &mut GateConfig) -> anyhow::Result<()> {
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if self.budget_max_increase_kb.is_some() {
            config.budget_max_increase_kb = self.budget_max_increase_kb;
        }
        if self.warn_above_kb.is_some() {
            config.warn_above_kb = self.warn_above_kb;
        }
        if self.fail_above_kb.is_some() {
            config.fail_above_kb = self.fail_above_kb;
        }
        if let Some(pages) = self.max_artifact_pages {
            config.max_artifact_pages = pages;
        }
        if let Some(branches) = &self.branches {
            config.branches = branches.clone();
        }
        if self.no_gzip {
            config.gzip = false;
        }
        if self.no_brotli {
            config.brotli = false;
        }

        config.sanitize();
        config.validate()
    }
}

/// Commit id for the current run: the context's commit, falling back to
/// `git rev-parse`, then "unknown"
pub(crate) fn resolve_commit(ctx: &RunContext) -> String {
    if ctx.commit != crate::context::UNKNOWN_COMMIT {
        return ctx.commit.clone();
    }
    GitRepository::new()
        .get_commit_hash()
        .ok()
        .flatten()
        .unwrap_or_else(|| crate::context::UNKNOWN_COMMIT.to_string())
}

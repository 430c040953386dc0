//! Check command: measure the current build, resolve a baseline, diff and
//! gate.

use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use crate::baseline::{ArchiveExtractor, BaselineFinder};
use crate::build::BuildRunner;
use crate::config::GateConfig;
use crate::context::RunContext;
use crate::diff::{diff, Status};
use crate::error::SizeGateError;
use crate::fmt;
use crate::remote::{ArtifactStore, GithubStore};
use crate::report;
use crate::stats::{detect_output_dir, BundleStats, Measurer};

use super::{resolve_commit, CliOverrides};

/// Run the comparison pipeline against the remote store.
///
/// # Errors
///
/// Returns an error when the build fails, no output directory can be
/// found, the baseline is oversized or malformed, or the gate fails.
pub fn cmd_check(root: &Path, ctx: &RunContext, overrides: &CliOverrides) -> Result<()> {
    let mut config = GateConfig::load(root)?;
    overrides.apply(&mut config)?;

    let store = GithubStore::new(ctx).context("Failed to initialize the artifact store")?;
    check_with_store(root, ctx, &config, overrides, &store)
}

/// Check against an explicit store implementation
pub fn check_with_store<S: ArtifactStore>(
    root: &Path,
    ctx: &RunContext,
    config: &GateConfig,
    overrides: &CliOverrides,
    store: &S,
) -> Result<()> {
    let current = measure_current(root, ctx, config, overrides, false)?;

    println!("{} Looking for a baseline to compare against", fmt::MAGNIFIER);
    let finder = BaselineFinder::new(store, ctx);
    let candidates = ctx.candidate_branches(&config.branches);
    let baseline = match finder.find_baseline(&candidates, config.max_artifact_pages) {
        Some(artifact) => {
            let extractor = ArchiveExtractor::new(store, &ctx.temp_root);
            extractor.load_baseline(&artifact)?
        }
        None => None,
    };
    if baseline.is_none() {
        info!("No usable baseline; this run establishes the first measurement");
    }

    let result = diff(baseline.as_ref(), &current, config);

    report::print_diff(&result);
    report::write_job_outputs(&result, ctx)?;
    report::write_job_summary(&result, ctx)?;
    report::upsert_comment(store, ctx, &result, config.fail_on_comment_error)?;

    if result.status == Status::Fail {
        let reason = result
            .failure_reason()
            .unwrap_or_else(|| "size gate violated".to_string());
        return Err(SizeGateError::GateFailed { reason }.into());
    }
    Ok(())
}

/// Build (unless skipped) and measure the output directory.
///
/// `quiet` suppresses status lines so machine-readable output stays clean.
pub(crate) fn measure_current(
    root: &Path,
    ctx: &RunContext,
    config: &GateConfig,
    overrides: &CliOverrides,
    quiet: bool,
) -> Result<BundleStats> {
    if !overrides.skip_build {
        BuildRunner::new(config.build.clone()).run(root)?;
    }

    let output_dir = resolve_output_dir(root, config)?;
    if !quiet {
        println!(
            "{} Measuring build output in {}",
            fmt::CHART,
            output_dir.display()
        );
    }

    let measurer = Measurer::from_config(config);
    let stats = measurer.measure(&output_dir, resolve_commit(ctx))?;
    info!(
        "Measured {} files: {} bytes raw, {} gzip, {} brotli",
        stats.files.len(),
        stats.total_size,
        stats.total_gzip,
        stats.total_brotli
    );
    Ok(stats)
}

fn resolve_output_dir(root: &Path, config: &GateConfig) -> Result<PathBuf, SizeGateError> {
    match &config.output_dir {
        Some(dir) if dir.is_absolute() => Ok(dir.clone()),
        Some(dir) => Ok(root.join(dir)),
        None => detect_output_dir(root),
    }
}

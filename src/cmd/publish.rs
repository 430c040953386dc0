//! Publish command: measure the current build and store it as the new
//! baseline (trunk path).

use anyhow::{Context, Result};
use std::path::Path;

use crate::baseline::BaselinePublisher;
use crate::config::GateConfig;
use crate::context::RunContext;
use crate::diff::diff;
use crate::fmt;
use crate::remote::{ArtifactStore, GithubStore};
use crate::report;

use super::check::measure_current;
use super::CliOverrides;

/// Measure and publish the current output as the new baseline.
///
/// The resulting status is `baseline-updated` regardless of how the
/// numbers compare; a trunk build's output becomes the reference even when
/// it is itself a regression.
pub fn cmd_publish(root: &Path, ctx: &RunContext, overrides: &CliOverrides) -> Result<()> {
    let mut config = GateConfig::load(root)?;
    overrides.apply(&mut config)?;

    let store = GithubStore::new(ctx).context("Failed to initialize the artifact store")?;
    publish_with_store(root, ctx, &config, overrides, &store)
}

/// Publish through an explicit store implementation
pub fn publish_with_store<S: ArtifactStore>(
    root: &Path,
    ctx: &RunContext,
    config: &GateConfig,
    overrides: &CliOverrides,
    store: &S,
) -> Result<()> {
    let current = measure_current(root, ctx, config, overrides, false)?;

    println!("{} Publishing new baseline", fmt::PACKAGE);
    let publisher = BaselinePublisher::new(store, &ctx.temp_root);
    publisher.publish(&current)?;

    let mut result = diff(None, &current, config);
    result.mark_baseline_updated();

    report::print_diff(&result);
    report::write_job_outputs(&result, ctx)?;
    report::write_job_summary(&result, ctx)?;

    Ok(())
}

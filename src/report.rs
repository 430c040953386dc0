//! Rendering and delivery of a diff result.
//!
//! Produces the PR comment body (with a hidden marker for upsert), the job
//! summary table, console output, and the CI job outputs file.

use console::style;
use log::{debug, warn};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;

use crate::context::RunContext;
use crate::diff::{SizeDiff, Status, ThresholdStatus};
use crate::error::SizeGateError;
use crate::fmt::{self, format_bytes, format_signed_bytes};
use crate::remote::ArtifactStore;

/// Hidden marker identifying the sizegate comment for upsert
pub const COMMENT_MARKER: &str = "<!-- sizegate-report -->";

/// Upper bound on comment pages walked during upsert
const MAX_COMMENT_PAGES: u32 = 20;

/// Render the PR comment body for a diff result
pub fn render_comment(diff: &SizeDiff) -> String {
    let mut body = String::new();
    body.push_str(COMMENT_MARKER);
    body.push_str("\n### 📦 Size report\n\n");
    body.push_str(&render_body(diff));
    body
}

/// Render the job-summary markdown for a diff result
pub fn render_summary(diff: &SizeDiff) -> String {
    let mut body = String::new();
    body.push_str("### 📦 Size report\n\n");
    body.push_str(&render_body(diff));
    body
}

fn render_body(diff: &SizeDiff) -> String {
    let mut out = String::new();

    let status_line = match diff.status {
        Status::Pass => format!(
            "**Status:** ✅ pass — total {} {}",
            diff.compare_metric.as_str(),
            format_signed_bytes(diff.diff_metric)
        ),
        Status::Fail => format!(
            "**Status:** ❌ fail — {}",
            diff.failure_reason()
                .unwrap_or_else(|| "size gate violated".to_string())
        ),
        Status::NoBaseline => {
            "**Status:** ℹ️ no baseline found — nothing to compare against yet".to_string()
        }
        Status::BaselineUpdated => format!(
            "**Status:** ✅ baseline updated to commit `{}`",
            diff.current.commit
        ),
    };
    out.push_str(&status_line);
    out.push_str("\n\n");

    if diff.threshold_status == ThresholdStatus::Warn {
        if let Some(message) = &diff.threshold_message {
            let _ = writeln!(out, "⚠️ {}\n", message);
        }
    }

    out.push_str("| Metric | Baseline | Current | Δ |\n");
    out.push_str("|---|---|---|---|\n");
    let rows: [(&str, u64, u64, i64, f64); 3] = [
        (
            "size",
            diff.baseline.as_ref().map(|b| b.total_size).unwrap_or(0),
            diff.current.total_size,
            diff.diff_size,
            diff.diff_percent_size,
        ),
        (
            "gzip",
            diff.baseline.as_ref().map(|b| b.total_gzip).unwrap_or(0),
            diff.current.total_gzip,
            diff.diff_gzip,
            diff.diff_percent_gzip,
        ),
        (
            "brotli",
            diff.baseline.as_ref().map(|b| b.total_brotli).unwrap_or(0),
            diff.current.total_brotli,
            diff.diff_brotli,
            diff.diff_percent_brotli,
        ),
    ];
    for (name, before, after, delta, percent) in rows {
        let marker = if name == diff.compare_metric.as_str() {
            " *"
        } else {
            ""
        };
        let baseline_cell = if diff.baseline.is_some() {
            format_bytes(before)
        } else {
            "—".to_string()
        };
        let _ = writeln!(
            out,
            "| {}{} | {} | {} | {} ({:+.2}%) |",
            name,
            marker,
            baseline_cell,
            format_bytes(after),
            format_signed_bytes(delta),
            percent
        );
    }
    out.push('\n');

    if !diff.top_changes.is_empty() {
        let _ = writeln!(
            out,
            "**Largest changes ({}):**\n",
            diff.compare_metric.as_str()
        );
        out.push_str("| File | Before | After | Δ |\n");
        out.push_str("|---|---|---|---|\n");
        for change in &diff.top_changes {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                change.path,
                format_bytes(change.before),
                format_bytes(change.after),
                format_signed_bytes(change.delta)
            );
        }
        out.push('\n');
    }

    if let Some(baseline) = &diff.baseline {
        let _ = writeln!(out, "_Baseline: commit `{}`_", baseline.commit);
    }

    out
}

/// Print a human-readable result to the console
pub fn print_diff(diff: &SizeDiff) {
    let (icon, status_text) = match diff.status {
        Status::Pass => (fmt::CHECKMARK, style("pass").green()),
        Status::Fail => (fmt::CROSSMARK, style("fail").red()),
        Status::NoBaseline => (fmt::INFO, style("no-baseline").cyan()),
        Status::BaselineUpdated => (fmt::CHECKMARK, style("baseline-updated").green()),
    };

    println!("\n{} Size gate: {}", icon, status_text);
    println!(
        "   total size {} | gzip {} | brotli {}",
        format_bytes(diff.current.total_size),
        format_bytes(diff.current.total_gzip),
        format_bytes(diff.current.total_brotli)
    );

    if diff.baseline.is_some() {
        println!(
            "   {} diff: {} ({:+.2}%)",
            diff.compare_metric.as_str(),
            format_signed_bytes(diff.diff_metric),
            match diff.compare_metric {
                crate::diff::Metric::Size => diff.diff_percent_size,
                crate::diff::Metric::Gzip => diff.diff_percent_gzip,
                crate::diff::Metric::Brotli => diff.diff_percent_brotli,
            }
        );
        for change in &diff.top_changes {
            println!(
                "   {} {}",
                style(&change.path).dim(),
                format_signed_bytes(change.delta)
            );
        }
    }

    if let Some(message) = &diff.threshold_message {
        let styled = match diff.threshold_status {
            ThresholdStatus::Fail => style(message.as_str()).red(),
            ThresholdStatus::Warn => style(message.as_str()).yellow(),
            ThresholdStatus::Ok => style(message.as_str()).dim(),
        };
        println!("   {} {}", fmt::WARNING, styled);
    }
}

/// Write the CI job outputs (`key=value` lines) when the runner provides an
/// outputs file
pub fn write_job_outputs(diff: &SizeDiff, ctx: &RunContext) -> Result<(), SizeGateError> {
    let Some(path) = &ctx.output_path else {
        debug!("No job outputs file configured, skipping outputs");
        return Ok(());
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SizeGateError::Io {
            context: format!("opening outputs file {}", path.display()),
            source,
        })?;

    let pairs = [
        ("total_size", diff.current.total_size.to_string()),
        ("total_gzip", diff.current.total_gzip.to_string()),
        ("total_brotli", diff.current.total_brotli.to_string()),
        ("diff_size", diff.diff_size.to_string()),
        ("diff_gzip", diff.diff_gzip.to_string()),
        ("diff_brotli", diff.diff_brotli.to_string()),
        ("status", diff.status.as_str().to_string()),
    ];
    for (key, value) in pairs {
        writeln!(file, "{}={}", key, value).map_err(|source| SizeGateError::Io {
            context: format!("writing outputs file {}", path.display()),
            source,
        })?;
    }
    Ok(())
}

/// Append the rendered summary to the job-summary file, when configured
pub fn write_job_summary(diff: &SizeDiff, ctx: &RunContext) -> Result<(), SizeGateError> {
    let Some(path) = &ctx.summary_path else {
        debug!("No job summary file configured, skipping summary");
        return Ok(());
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SizeGateError::Io {
            context: format!("opening summary file {}", path.display()),
            source,
        })?;
    file.write_all(render_summary(diff).as_bytes())
        .map_err(|source| SizeGateError::Io {
            context: format!("writing summary file {}", path.display()),
            source,
        })?;
    Ok(())
}

/// Create or update the sizegate comment on the current pull request.
///
/// Failures warn unless `fail_on_error` is set, in which case they
/// propagate as [`SizeGateError::CommentFailed`].
pub fn upsert_comment<S: ArtifactStore>(
    store: &S,
    ctx: &RunContext,
    diff: &SizeDiff,
    fail_on_error: bool,
) -> Result<(), SizeGateError> {
    let Some(pr_number) = ctx.pr_number else {
        debug!("Not a pull request, skipping comment");
        return Ok(());
    };

    let body = render_comment(diff);
    match try_upsert(store, pr_number, &body) {
        Ok(()) => Ok(()),
        Err(source) if fail_on_error => Err(SizeGateError::CommentFailed { source }),
        Err(err) => {
            warn!("Failed to post PR comment: {}", err);
            Ok(())
        }
    }
}

fn try_upsert<S: ArtifactStore>(
    store: &S,
    pr_number: u64,
    body: &str,
) -> Result<(), crate::remote::RemoteError> {
    for page in 1..=MAX_COMMENT_PAGES {
        let comments = store.list_comments(pr_number, page)?;
        let exhausted = comments.len() < 100;

        if let Some(existing) = comments.iter().find(|c| {
            c.body
                .as_deref()
                .map(|b| b.contains(COMMENT_MARKER))
                .unwrap_or(false)
        }) {
            return store.update_comment(existing.id, body);
        }

        if exhausted {
            break;
        }
    }

    store.create_comment(pr_number, body)
}

//! Size diff and threshold engine.
//!
//! [`diff`] is a pure function of (baseline, current, configuration): it
//! computes aggregate and per-file deltas, ranks the most impactful
//! changes, and evaluates the budget and per-file thresholds against one
//! comparison metric chosen for the whole run.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::GateConfig;
use crate::fmt::{format_kb, format_signed_bytes};
use crate::stats::{BundleStats, FileStats};

/// Maximum entries reported in the top-changes ranking
pub const TOP_CHANGES_LIMIT: usize = 5;

/// The size dimension all budget/threshold math uses for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Brotli-compressed bytes
    Brotli,
    /// Gzip-compressed bytes
    Gzip,
    /// Raw bytes
    Size,
}

impl Metric {
    /// Fixed precedence: brotli if enabled, else gzip if enabled, else raw
    pub fn select(gzip_enabled: bool, brotli_enabled: bool) -> Self {
        if brotli_enabled {
            Self::Brotli
        } else if gzip_enabled {
            Self::Gzip
        } else {
            Self::Size
        }
    }

    /// Stable name used in outputs and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brotli => "brotli",
            Self::Gzip => "gzip",
            Self::Size => "size",
        }
    }

    fn of(&self, file: &FileStats) -> u64 {
        match self {
            Self::Brotli => file.brotli,
            Self::Gzip => file.gzip,
            Self::Size => file.size,
        }
    }

    fn total(&self, stats: &BundleStats) -> u64 {
        match self {
            Self::Brotli => stats.total_brotli,
            Self::Gzip => stats.total_gzip,
            Self::Size => stats.total_size,
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Baseline present, gate passed
    Pass,
    /// Baseline present, budget or per-file threshold violated
    Fail,
    /// No baseline could be resolved; nothing to compare against
    NoBaseline,
    /// This run's output was published as the new baseline
    BaselineUpdated,
}

impl Status {
    /// Stable name exposed as a CI job output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::NoBaseline => "no-baseline",
            Self::BaselineUpdated => "baseline-updated",
        }
    }
}

/// Per-file threshold verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    /// No threshold violated (or none evaluated)
    Ok,
    /// Largest per-file delta above the warn threshold
    Warn,
    /// Largest per-file delta above the fail threshold
    Fail,
}

impl ThresholdStatus {
    /// Stable name for rendering
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }
}

/// One entry of the top-changes ranking, in the comparison metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// File path (relative, as measured)
    pub path: String,
    /// Bytes in the baseline snapshot (0 when added)
    pub before: u64,
    /// Bytes in the current snapshot (0 when removed)
    pub after: u64,
    /// `after - before`
    pub delta: i64,
}

/// Result of comparing a current measurement against a baseline.
///
/// A pure function of its inputs: no hidden state, fully reproducible.
#[derive(Debug, Clone, Serialize)]
pub struct SizeDiff {
    /// Baseline snapshot, when one was resolved
    pub baseline: Option<BundleStats>,
    /// Current snapshot
    pub current: BundleStats,
    /// Raw-size delta (0 without a baseline)
    pub diff_size: i64,
    /// Gzip delta (0 without a baseline)
    pub diff_gzip: i64,
    /// Brotli delta (0 without a baseline)
    pub diff_brotli: i64,
    /// Raw-size delta in percent (0 when the baseline total is 0)
    pub diff_percent_size: f64,
    /// Gzip delta in percent (0 when the baseline total is 0)
    pub diff_percent_gzip: f64,
    /// Brotli delta in percent (0 when the baseline total is 0)
    pub diff_percent_brotli: f64,
    /// The metric all gating math uses
    pub compare_metric: Metric,
    /// Delta of the comparison metric
    pub diff_metric: i64,
    /// Largest per-file changes in the comparison metric
    pub top_changes: Vec<FileChange>,
    /// Terminal state of the run
    pub status: Status,
    /// Per-file threshold verdict
    pub threshold_status: ThresholdStatus,
    /// Explanation of the threshold verdict, when one was evaluated
    pub threshold_message: Option<String>,
    /// Echoed configuration: aggregate budget (KB)
    pub budget_max_increase_kb: Option<f64>,
    /// Echoed configuration: per-file warn threshold (KB)
    pub warn_above_kb: Option<f64>,
    /// Echoed configuration: per-file fail threshold (KB)
    pub fail_above_kb: Option<f64>,
}

impl SizeDiff {
    /// Mark this run's output as the new reference (trunk path).
    ///
    /// Set by the caller after publishing, never derived from the numbers.
    pub fn mark_baseline_updated(&mut self) {
        self.status = Status::BaselineUpdated;
    }

    /// Why the gate failed, when it did
    pub fn failure_reason(&self) -> Option<String> {
        if self.status != Status::Fail {
            return None;
        }

        if let Some(budget_kb) = self.budget_max_increase_kb {
            if self.diff_metric as f64 > budget_kb * 1024.0 {
                return Some(format!(
                    "total {} grew {} ({}), budget is {} KB",
                    self.compare_metric.as_str(),
                    format_signed_bytes(self.diff_metric),
                    format_kb(self.diff_metric.unsigned_abs()),
                    budget_kb
                ));
            }
        }

        self.threshold_message.clone()
    }
}

/// Compare `current` against `baseline` under `config`.
///
/// # Examples
///
/// ```
/// use sizegate::config::GateConfig;
/// use sizegate::diff::{diff, Status};
/// use sizegate::stats::BundleStats;
///
/// let current = BundleStats::new(vec![], "abc".to_string());
/// let result = diff(None, &current, &GateConfig::default());
/// assert_eq!(result.status, Status::NoBaseline);
/// assert_eq!(result.diff_size, 0);
/// ```
pub fn diff(baseline: Option<&BundleStats>, current: &BundleStats, config: &GateConfig) -> SizeDiff {
    let metric = Metric::select(config.gzip, config.brotli);

    let Some(baseline) = baseline else {
        // No comparison point: report zeroes rather than diffing against a
        // phantom empty snapshot, and evaluate no thresholds.
        return SizeDiff {
            baseline: None,
            current: current.clone(),
            diff_size: 0,
            diff_gzip: 0,
            diff_brotli: 0,
            diff_percent_size: 0.0,
            diff_percent_gzip: 0.0,
            diff_percent_brotli: 0.0,
            compare_metric: metric,
            diff_metric: 0,
            top_changes: Vec::new(),
            status: Status::NoBaseline,
            threshold_status: ThresholdStatus::Ok,
            threshold_message: None,
            budget_max_increase_kb: config.budget_max_increase_kb,
            warn_above_kb: config.warn_above_kb,
            fail_above_kb: config.fail_above_kb,
        };
    };

    let diff_size = current.total_size as i64 - baseline.total_size as i64;
    let diff_gzip = current.total_gzip as i64 - baseline.total_gzip as i64;
    let diff_brotli = current.total_brotli as i64 - baseline.total_brotli as i64;

    let top_changes = rank_changes(baseline, current, metric);
    let diff_metric = metric.total(current) as i64 - metric.total(baseline) as i64;

    let (threshold_status, threshold_message) =
        evaluate_thresholds(&top_changes, config.warn_above_kb, config.fail_above_kb);

    let budget_exceeded = config
        .budget_max_increase_kb
        .map(|kb| diff_metric as f64 > kb * 1024.0)
        .unwrap_or(false);

    let status = if budget_exceeded || threshold_status == ThresholdStatus::Fail {
        Status::Fail
    } else {
        Status::Pass
    };

    SizeDiff {
        baseline: Some(baseline.clone()),
        current: current.clone(),
        diff_size,
        diff_gzip,
        diff_brotli,
        diff_percent_size: percent(diff_size, baseline.total_size),
        diff_percent_gzip: percent(diff_gzip, baseline.total_gzip),
        diff_percent_brotli: percent(diff_brotli, baseline.total_brotli),
        compare_metric: metric,
        diff_metric,
        top_changes,
        status,
        threshold_status,
        threshold_message,
        budget_max_increase_kb: config.budget_max_increase_kb,
        warn_above_kb: config.warn_above_kb,
        fail_above_kb: config.fail_above_kb,
    }
}

/// Percentage change; 0 when the baseline total is 0 (note: callers must
/// not read a 0% figure as "unchanged" in that case)
fn percent(delta: i64, baseline_total: u64) -> f64 {
    if baseline_total == 0 {
        0.0
    } else {
        (delta as f64 / baseline_total as f64) * 100.0
    }
}

/// Rank per-file deltas across the union of both snapshots.
///
/// Missing sides count as 0 (added/removed files). Unchanged files are not
/// changes. Sorted by absolute delta descending, path ascending on ties,
/// capped at [`TOP_CHANGES_LIMIT`].
fn rank_changes(baseline: &BundleStats, current: &BundleStats, metric: Metric) -> Vec<FileChange> {
    let mut union: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for file in &baseline.files {
        union.entry(file.path.as_str()).or_default().0 = metric.of(file);
    }
    for file in &current.files {
        union.entry(file.path.as_str()).or_default().1 = metric.of(file);
    }

    let mut changes: Vec<FileChange> = union
        .into_iter()
        .filter_map(|(path, (before, after))| {
            let delta = after as i64 - before as i64;
            (delta != 0).then(|| FileChange {
                path: path.to_string(),
                before,
                after,
                delta,
            })
        })
        .collect();

    changes.sort_by(|a, b| {
        b.delta
            .abs()
            .cmp(&a.delta.abs())
            .then_with(|| a.path.cmp(&b.path))
    });
    changes.truncate(TOP_CHANGES_LIMIT);
    changes
}

/// Evaluate the per-file thresholds against the single largest delta.
///
/// Fail takes precedence over warn; only growth can violate. Thresholds
/// are independent of the aggregate budget.
fn evaluate_thresholds(
    top_changes: &[FileChange],
    warn_above_kb: Option<f64>,
    fail_above_kb: Option<f64>,
) -> (ThresholdStatus, Option<String>) {
    let Some(worst) = top_changes.first() else {
        return (ThresholdStatus::Ok, None);
    };

    if let Some(fail_kb) = fail_above_kb {
        if worst.delta as f64 > fail_kb * 1024.0 {
            return (
                ThresholdStatus::Fail,
                Some(format!(
                    "{} grew {} (fail threshold: {} KB)",
                    worst.path,
                    format_signed_bytes(worst.delta),
                    fail_kb
                )),
            );
        }
    }

    if let Some(warn_kb) = warn_above_kb {
        if worst.delta as f64 > warn_kb * 1024.0 {
            return (
                ThresholdStatus::Warn,
                Some(format!(
                    "{} grew {} (warn threshold: {} KB)",
                    worst.path,
                    format_signed_bytes(worst.delta),
                    warn_kb
                )),
            );
        }
    }

    (ThresholdStatus::Ok, None)
}

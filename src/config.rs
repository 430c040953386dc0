//! Configuration for size measurement and gating.
//!
//! Configuration comes from an optional `.sizegate.toml` file merged under
//! CLI flags. Unparseable values fail at the parse boundary; negative
//! numbers are warned about and treated as unset.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = ".sizegate.toml";

/// Default page budget for the repository-wide artifact scan
pub const DEFAULT_MAX_ARTIFACT_PAGES: u32 = 10;

/// Default build timeout in seconds
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 600;

/// Gate configuration consumed by measurement, lookup and diff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GateConfig {
    /// Include gzip sizes in measurement and comparison
    #[serde(default = "default_true")]
    pub gzip: bool,

    /// Include brotli sizes in measurement and comparison
    #[serde(default = "default_true")]
    pub brotli: bool,

    /// Maximum allowed aggregate increase in the comparison metric (KB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_max_increase_kb: Option<f64>,

    /// Per-file warn threshold on the largest delta (KB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn_above_kb: Option<f64>,

    /// Per-file fail threshold on the largest delta (KB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_above_kb: Option<f64>,

    /// Page budget for the repository-wide artifact scan
    #[serde(default = "default_max_pages")]
    pub max_artifact_pages: u32,

    /// Candidate baseline branches, in priority order
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,

    /// Propagate PR-comment posting failures instead of warning
    #[serde(default)]
    pub fail_on_comment_error: bool,

    /// Build output directory; auto-detected when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Build command settings
    #[serde(default)]
    pub build: BuildSettings,
}

/// Build command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildSettings {
    /// Command to run before measuring; skipped when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Seconds before the build is killed
    #[serde(default = "default_build_timeout")]
    pub timeout_secs: u64,

    /// Run the command through `sh -c` instead of direct argv execution
    #[serde(default)]
    pub shell: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_ARTIFACT_PAGES
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_build_timeout() -> u64 {
    DEFAULT_BUILD_TIMEOUT_SECS
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            gzip: true,
            brotli: true,
            budget_max_increase_kb: None,
            warn_above_kb: None,
            fail_above_kb: None,
            max_artifact_pages: DEFAULT_MAX_ARTIFACT_PAGES,
            branches: default_branches(),
            fail_on_comment_error: false,
            output_dir: None,
            build: BuildSettings::default(),
        }
    }
}

impl GateConfig {
    /// Load configuration from `<root>/.sizegate.toml`.
    ///
    /// A missing file yields the defaults; a malformed file is a hard error
    /// (invalid configuration aborts the run).
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_with_fs(root, &crate::infra::RealFileSystem)
    }

    /// Load configuration with a custom filesystem implementation
    pub fn load_with_fs<FS: crate::infra::FileSystem>(root: &Path, fs: &FS) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs
            .read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut config: GateConfig = toml_edit::de::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Drop out-of-range values with a warning.
    ///
    /// Negative thresholds and a zero page budget are operator mistakes that
    /// should not abort a CI run; they are logged and replaced.
    pub fn sanitize(&mut self) {
        for (name, slot) in [
            ("budget-max-increase-kb", &mut self.budget_max_increase_kb),
            ("warn-above-kb", &mut self.warn_above_kb),
            ("fail-above-kb", &mut self.fail_above_kb),
        ] {
            if let Some(value) = *slot {
                if value < 0.0 {
                    warn!("Ignoring negative {}: {}", name, value);
                    *slot = None;
                }
            }
        }

        if self.max_artifact_pages == 0 {
            warn!(
                "max-artifact-pages must be positive, using default {}",
                DEFAULT_MAX_ARTIFACT_PAGES
            );
            self.max_artifact_pages = DEFAULT_MAX_ARTIFACT_PAGES;
        }
    }

    /// Reject threshold combinations that can never be satisfied
    pub fn validate(&self) -> Result<()> {
        if let (Some(warn), Some(fail)) = (self.warn_above_kb, self.fail_above_kb) {
            if warn > fail {
                anyhow::bail!(
                    "warn-above-kb ({} KB) cannot exceed fail-above-kb ({} KB)",
                    warn,
                    fail
                );
            }
        }
        Ok(())
    }
}

//! Enhanced error types with contextual suggestions
//!
//! Provides structured error types that include:
//! - Actionable error messages
//! - Suggested fixes and recovery actions
//! - Documentation links
//! - Proper exit codes for CI/CD

use std::path::PathBuf;
use thiserror::Error;

use crate::fmt::format_bytes;
use crate::remote::RemoteError;

/// Enhanced sizegate errors with contextual suggestions
#[derive(Debug, Error)]
pub enum SizeGateError {
    /// Downloaded baseline archive exceeds the size ceiling
    #[error("Baseline artifact ({actual} bytes) exceeds download limit ({limit} bytes)")]
    ArtifactTooLarge {
        /// Downloaded size
        actual: u64,
        /// Fixed ceiling
        limit: u64,
    },

    /// Stored measurement record could not be parsed
    #[error("Malformed baseline record: {name}")]
    MalformedBaseline {
        /// Record file name
        name: String,
        #[source]
        /// Parse error source
        source: serde_json::Error,
    },

    /// No build output directory could be located
    #[error("No build output directory found")]
    OutputDirNotFound {
        /// Directories that were checked
        searched: Vec<PathBuf>,
    },

    /// Build command exited unsuccessfully
    #[error("Build command failed: {command}")]
    BuildFailed {
        /// Command that failed
        command: String,
        /// Error output
        stderr: String,
    },

    /// Build command exceeded its timeout
    #[error("Build command timed out after {timeout_secs}s: {command}")]
    BuildTimeout {
        /// Command that was killed
        command: String,
        /// Configured timeout
        timeout_secs: u64,
    },

    /// Build program is not installed
    #[error("Tool not installed: {tool}")]
    ToolMissing {
        /// Program name
        tool: String,
    },

    /// Size gate rejected the change
    #[error("Size gate failed: {reason}")]
    GateFailed {
        /// Which budget or threshold was violated
        reason: String,
    },

    /// PR comment could not be posted and failures are configured as fatal
    #[error("Failed to post PR comment")]
    CommentFailed {
        #[source]
        /// Remote error source
        source: RemoteError,
    },

    /// Generic I/O error with context
    #[error("I/O error: {context}")]
    Io {
        /// Context about where the error occurred
        context: String,
        #[source]
        /// IO error source
        source: std::io::Error,
    },

    /// Remote store call failed
    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),
}

impl SizeGateError {
    /// Get actionable suggestion for resolving this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use sizegate::error::SizeGateError;
    ///
    /// let error = SizeGateError::ToolMissing { tool: "npm".to_string() };
    /// assert!(error.suggestion().unwrap().contains("npm"));
    /// ```
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ArtifactTooLarge { actual, limit } => Some(format!(
                "The stored baseline is {} but the download ceiling is {}. \
                 Check what is being published as the baseline artifact",
                format_bytes(*actual),
                format_bytes(*limit)
            )),
            Self::MalformedBaseline { name, .. } => Some(format!(
                "Delete or republish the baseline artifact; {} could not be parsed",
                name
            )),
            Self::OutputDirNotFound { searched } => Some(format!(
                "Set output-dir in .sizegate.toml or pass --output-dir. Searched: {}",
                searched
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Self::BuildFailed { stderr, .. } => {
                if stderr.trim().is_empty() {
                    Some("Check the build output above and fix the build".to_string())
                } else {
                    Some(format!("Build stderr:\n{}", stderr.trim()))
                }
            }
            Self::BuildTimeout { timeout_secs, .. } => Some(format!(
                "Raise build.timeout-secs (currently {}) or speed up the build",
                timeout_secs
            )),
            Self::ToolMissing { tool } => {
                Some(format!("Install {} and ensure it is on PATH", tool))
            }
            Self::GateFailed { .. } => Some(
                "Reduce the size of the change, or raise the configured budget/thresholds"
                    .to_string(),
            ),
            Self::CommentFailed { .. } => Some(
                "Check the token's permissions, or unset fail-on-comment-error to degrade to a warning"
                    .to_string(),
            ),
            Self::Io { context, .. } => Some(format!(
                "Check file permissions and that {} is accessible",
                context
            )),
            Self::Remote(_) => {
                Some("Check the token, repository slug and network connectivity".to_string())
            }
        }
    }

    /// Get documentation URL for this error.
    pub fn docs_url(&self) -> Option<&str> {
        match self {
            Self::GateFailed { .. } => {
                Some("https://github.com/sizegate/sizegate#budgets-and-thresholds")
            }
            Self::ArtifactTooLarge { .. } | Self::MalformedBaseline { .. } => {
                Some("https://github.com/sizegate/sizegate#baselines")
            }
            Self::CommentFailed { .. } => {
                Some("https://github.com/sizegate/sizegate#pr-comments")
            }
            _ => None,
        }
    }

    /// Get appropriate exit code for this error.
    ///
    /// Follows sysexits.h conventions where one fits; gate failures exit 1
    /// so CI marks the job failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolMissing { .. } => 127, // Command not found (Unix convention)
            Self::OutputDirNotFound { .. } => 66, // EX_NOINPUT
            Self::ArtifactTooLarge { .. } => 65, // EX_DATAERR
            Self::MalformedBaseline { .. } => 65, // EX_DATAERR
            Self::BuildFailed { .. } => 1,
            Self::BuildTimeout { .. } => 1,
            Self::GateFailed { .. } => 1, // CI should fail
            Self::CommentFailed { .. } => 74, // EX_IOERR
            Self::Io { .. } => 74,        // EX_IOERR
            Self::Remote(_) => 74,        // EX_IOERR
        }
    }
}

/// Error formatter with colors and structured output
pub struct ErrorFormatter;

impl ErrorFormatter {
    /// Format error with suggestions and documentation links
    pub fn format(error: &anyhow::Error) -> String {
        use console::style;

        let mut output = String::new();

        // Main error message
        output.push_str(&format!("{} {}\n", style("error:").red().bold(), error));

        // Error chain (caused by)
        let mut source = error.source();
        let mut indent = 1;
        while let Some(err) = source {
            output.push_str(&format!(
                "{}{} {}\n",
                "  ".repeat(indent),
                style("caused by:").yellow(),
                err
            ));
            source = err.source();
            indent += 1;
        }

        // Try to downcast to SizeGateError for suggestions
        if let Some(sg_error) = error.downcast_ref::<SizeGateError>() {
            if let Some(suggestion) = sg_error.suggestion() {
                output.push_str(&format!(
                    "\n{} {}\n",
                    style("help:").cyan().bold(),
                    suggestion
                ));
            }

            if let Some(docs) = sg_error.docs_url() {
                output.push_str(&format!("{} {}\n", style("docs:").blue(), docs));
            }
        }

        output
    }

    /// Get exit code from error
    pub fn exit_code(error: &anyhow::Error) -> i32 {
        if let Some(sg_error) = error.downcast_ref::<SizeGateError>() {
            sg_error.exit_code()
        } else {
            1 // Generic error
        }
    }
}

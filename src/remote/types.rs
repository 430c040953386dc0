//! Wire types for the remote artifact/workflow API.
//!
//! Responses are decoded against the richer envelope shape first, falling
//! back to a bare list; the ambiguity is contained in
//! [`parse_listing`] instead of scattered shape checks.

use serde::Deserialize;
use serde_json::Value;

/// A workflow definition known to the repository
#[derive(Debug, Clone, Deserialize)]
pub struct Workflow {
    /// Numeric workflow id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Repository-relative path of the workflow file
    pub path: String,
}

/// A single run of a workflow
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    /// Numeric run id
    pub id: u64,
    /// Branch the run was triggered from
    pub head_branch: Option<String>,
}

/// A stored artifact, as listed by the remote store.
///
/// This doubles as the transient reference the baseline lookup hands to the
/// extractor: numeric id, name, expiry flag and the optional association
/// with the workflow run that produced it.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    /// Numeric artifact id
    pub id: u64,
    /// Artifact name
    pub name: String,
    /// Whether the artifact's retention period has lapsed
    #[serde(default)]
    pub expired: bool,
    /// Stored (compressed) size in bytes
    #[serde(default)]
    pub size_in_bytes: u64,
    /// Workflow run that produced the artifact, when reported
    #[serde(default)]
    pub workflow_run: Option<ArtifactRun>,
}

/// Workflow-run association carried on an artifact listing
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactRun {
    /// Numeric run id
    pub id: Option<u64>,
    /// Branch the producing run was triggered from
    pub head_branch: Option<String>,
}

/// A comment on a pull request
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    /// Numeric comment id
    pub id: u64,
    /// Comment body
    pub body: Option<String>,
}

/// Decode a listing response that may be an `{ "<key>": [...] }` envelope
/// or a bare JSON list.
///
/// # Examples
///
/// ```
/// use sizegate::remote::types::{parse_listing, Artifact};
///
/// let enveloped = serde_json::json!({"total_count": 1, "artifacts": [
///     {"id": 7, "name": "sizegate-baseline"}
/// ]});
/// let bare = serde_json::json!([{"id": 7, "name": "sizegate-baseline"}]);
///
/// let a: Vec<Artifact> = parse_listing(enveloped, "artifacts").unwrap();
/// let b: Vec<Artifact> = parse_listing(bare, "artifacts").unwrap();
/// assert_eq!(a[0].id, b[0].id);
/// ```
pub fn parse_listing<T: for<'de> Deserialize<'de>>(
    value: Value,
    key: &str,
) -> Result<Vec<T>, serde_json::Error> {
    if let Value::Object(map) = &value {
        if let Some(items) = map.get(key) {
            return serde_json::from_value(items.clone());
        }
    }
    serde_json::from_value(value)
}

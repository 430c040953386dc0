//! GitHub-backed implementation of the artifact store.
//!
//! Listing, download and comment calls go through the REST API; artifact
//! upload goes through the Actions runtime endpoints (container create →
//! content PUT → finalize), which is the only write path the runner
//! exposes. Both bases and tokens come from the [`RunContext`].

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header;
use serde_json::{json, Value};

use crate::context::RunContext;

use super::api::{ArtifactPage, ArtifactStore, RemoteError, ARTIFACTS_PER_PAGE};
use super::types::{parse_listing, Artifact, IssueComment, Workflow, WorkflowRun};

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const RUNTIME_API_VERSION: &str = "6.0-preview";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Actions runtime endpoint for artifact upload
#[derive(Debug, Clone)]
struct RuntimeEndpoint {
    url: String,
    token: String,
}

/// Remote store over the GitHub REST and Actions runtime APIs
pub struct GithubStore {
    client: Client,
    api_base: String,
    repository: String,
    token: String,
    run_id: Option<u64>,
    runtime: Option<RuntimeEndpoint>,
}

impl GithubStore {
    /// Build a store from the run context
    pub fn new(ctx: &RunContext) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("sizegate/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()?;

        let runtime = match (&ctx.runtime_url, &ctx.runtime_token) {
            (Some(url), Some(token)) => Some(RuntimeEndpoint {
                url: url.clone(),
                token: token.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            client,
            api_base: ctx.api_base.trim_end_matches('/').to_string(),
            repository: ctx.repository.clone(),
            token: ctx.token.clone(),
            run_id: ctx.run_id,
            runtime,
        })
    }

    fn get_json(&self, url: &str) -> Result<Value, RemoteError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(API_VERSION_HEADER, API_VERSION)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json()?)
    }

    fn listing<T: for<'de> serde::Deserialize<'de>>(
        &self,
        url: &str,
        key: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let value = self.get_json(url)?;
        parse_listing(value, key).map_err(|source| RemoteError::Decode {
            context: format!("{} listing", key),
            source,
        })
    }

    fn runtime(&self) -> Result<&RuntimeEndpoint, RemoteError> {
        self.runtime
            .as_ref()
            .ok_or_else(|| RemoteError::UploadUnavailable("ACTIONS_RUNTIME_URL".to_string()))
    }

    fn run_id(&self) -> Result<u64, RemoteError> {
        self.run_id
            .ok_or_else(|| RemoteError::UploadUnavailable("GITHUB_RUN_ID".to_string()))
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}

impl ArtifactStore for GithubStore {
    fn list_workflows(&self) -> Result<Vec<Workflow>, RemoteError> {
        let url = format!(
            "{}/repos/{}/actions/workflows",
            self.api_base, self.repository
        );
        self.listing(&url, "workflows")
    }

    fn list_workflow_runs(
        &self,
        workflow_id: u64,
        branch: &str,
        limit: u32,
    ) -> Result<Vec<WorkflowRun>, RemoteError> {
        let encoded: String = url::form_urlencoded::byte_serialize(branch.as_bytes()).collect();
        let url = format!(
            "{}/repos/{}/actions/workflows/{}/runs?branch={}&per_page={}",
            self.api_base, self.repository, workflow_id, encoded, limit
        );
        self.listing(&url, "workflow_runs")
    }

    fn list_run_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, RemoteError> {
        let url = format!(
            "{}/repos/{}/actions/runs/{}/artifacts",
            self.api_base, self.repository, run_id
        );
        self.listing(&url, "artifacts")
    }

    fn artifacts_page(&self, page: u32) -> Result<ArtifactPage, RemoteError> {
        let url = format!(
            "{}/repos/{}/actions/artifacts?per_page={}&page={}",
            self.api_base, self.repository, ARTIFACTS_PER_PAGE, page
        );
        let artifacts: Vec<Artifact> = self.listing(&url, "artifacts")?;
        let done = (artifacts.len() as u32) < ARTIFACTS_PER_PAGE;
        Ok(ArtifactPage { artifacts, done })
    }

    fn download_artifact(&self, artifact_id: u64) -> Result<Vec<u8>, RemoteError> {
        let url = format!(
            "{}/repos/{}/actions/artifacts/{}/zip",
            self.api_base, self.repository, artifact_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()?;

        let response = Self::check_status(response)?;
        Ok(response.bytes()?.to_vec())
    }

    fn upload_artifact(
        &self,
        name: &str,
        files: &[&Path],
        retention_days: u32,
    ) -> Result<(), RemoteError> {
        let runtime = self.runtime()?.clone();
        let run_id = self.run_id()?;
        let base = format!(
            "{}/_apis/pipelines/workflows/{}/artifacts?api-version={}",
            runtime.url.trim_end_matches('/'),
            run_id,
            RUNTIME_API_VERSION
        );

        // Create the artifact container
        let response = self
            .client
            .post(&base)
            .bearer_auth(&runtime.token)
            .json(&json!({
                "type": "actions_storage",
                "name": name,
                "retentionDays": retention_days,
            }))
            .send()?;
        let container: Value = Self::check_status(response)?.json()?;
        let container_url = container
            .get("fileContainerResourceUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Decode {
                context: "artifact container".to_string(),
                source: <serde_json::Error as serde::de::Error>::custom(
                    "missing fileContainerResourceUrl",
                ),
            })?
            .to_string();

        // Upload each file into the container
        let mut total: u64 = 0;
        for file in files {
            let contents = std::fs::read(file).map_err(|source| RemoteError::Io {
                context: format!("reading {}", file.display()),
                source,
            })?;
            let len = contents.len() as u64;
            total += len;

            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let item_path: String =
                url::form_urlencoded::byte_serialize(format!("{}/{}", name, file_name).as_bytes())
                    .collect();
            let upload_url = format!("{}?itemPath={}", container_url, item_path);

            let response = self
                .client
                .put(&upload_url)
                .bearer_auth(&runtime.token)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes 0-{}/{}", len.saturating_sub(1), len),
                )
                .body(contents)
                .send()?;
            Self::check_status(response)?;
        }

        // Finalize with the total size
        let encoded_name: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
        let finalize_url = format!("{}&artifactName={}", base, encoded_name);
        let response = self
            .client
            .patch(&finalize_url)
            .bearer_auth(&runtime.token)
            .json(&json!({ "size": total }))
            .send()?;
        Self::check_status(response)?;

        Ok(())
    }

    fn list_comments(&self, pr_number: u64, page: u32) -> Result<Vec<IssueComment>, RemoteError> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments?per_page=100&page={}",
            self.api_base, self.repository, pr_number, page
        );
        let value = self.get_json(&url)?;
        serde_json::from_value(value).map_err(|source| RemoteError::Decode {
            context: "comment listing".to_string(),
            source,
        })
    }

    fn create_comment(&self, pr_number: u64, body: &str) -> Result<(), RemoteError> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            self.api_base, self.repository, pr_number
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&json!({ "body": body }))
            .send()?;
        Self::check_status(response)?;
        Ok(())
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), RemoteError> {
        let url = format!(
            "{}/repos/{}/issues/comments/{}",
            self.api_base, self.repository, comment_id
        );
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&json!({ "body": body }))
            .send()?;
        Self::check_status(response)?;
        Ok(())
    }
}

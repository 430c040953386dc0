//! Test fixture helpers for creating measurable output directories and run
//! contexts.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use sizegate::context::RunContext;

/// Create a project root with a populated `dist/` output directory.
///
/// `files` maps relative paths (under dist/) to file sizes; contents are a
/// repeated single byte, so compressed sizes are small and stable.
pub fn project_with_dist(files: &[(&str, usize)]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    for (rel, size) in files {
        let path = temp_dir.path().join("dist").join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create dist subdirectory");
        }
        fs::write(&path, vec![b'a'; *size]).expect("Failed to write fixture file");
    }
    temp_dir
}

/// Pull-request run context pointing its temp root at `temp_root`
pub fn pr_context(temp_root: &Path) -> RunContext {
    RunContext {
        event_name: "pull_request".to_string(),
        ref_name: "refs/pull/12/merge".to_string(),
        repository: "octo/app".to_string(),
        commit: "feature1".to_string(),
        pr_number: Some(12),
        pr_base_branch: Some("main".to_string()),
        run_id: Some(42),
        workflow_name: "size".to_string(),
        workflow_ref: "octo/app/.github/workflows/size.yml@refs/pull/12/merge".to_string(),
        token: String::new(),
        api_base: String::new(),
        runtime_url: None,
        runtime_token: None,
        output_path: None,
        summary_path: None,
        temp_root: temp_root.to_path_buf(),
    }
}

/// Trunk (push) run context pointing its temp root at `temp_root`
pub fn trunk_context(temp_root: &Path) -> RunContext {
    let mut ctx = pr_context(temp_root);
    ctx.event_name = "push".to_string();
    ctx.ref_name = "refs/heads/main".to_string();
    ctx.commit = "trunk123".to_string();
    ctx.pr_number = None;
    ctx.pr_base_branch = None;
    ctx
}

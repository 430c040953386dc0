//! Directory measurement: walk a build output directory and compute
//! per-file raw/gzip/brotli sizes on a bounded worker pool.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::warn;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::GateConfig;
use crate::error::SizeGateError;
use crate::infra::{FileSystem, RealFileSystem};

use super::record::{BundleStats, FileStats};

/// Conventional output directories checked by auto-detection, in order
pub const OUTPUT_DIR_CANDIDATES: &[&str] = &["dist", "build", "out", "public", "pkg"];

/// Compression workers measuring files concurrently
pub const MEASURE_WORKERS: usize = 4;

/// Locate the build output directory under `root`.
///
/// Returns the first candidate that exists and contains at least one entry.
pub fn detect_output_dir(root: &Path) -> Result<PathBuf, SizeGateError> {
    let mut searched = Vec::new();
    for candidate in OUTPUT_DIR_CANDIDATES {
        let path = root.join(candidate);
        let populated = path.is_dir()
            && std::fs::read_dir(&path)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
        if populated {
            return Ok(path);
        }
        searched.push(path);
    }
    Err(SizeGateError::OutputDirNotFound { searched })
}

/// Measures a directory into a [`BundleStats`] record
pub struct Measurer<FS: FileSystem = RealFileSystem> {
    gzip: bool,
    brotli: bool,
    show_progress: bool,
    fs: FS,
}

impl Measurer<RealFileSystem> {
    /// Build a measurer honoring the configured compression toggles
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            gzip: config.gzip,
            brotli: config.brotli,
            show_progress: console::user_attended(),
            fs: RealFileSystem,
        }
    }

    /// Create a measurer with explicit toggles and no progress display
    pub fn new(gzip: bool, brotli: bool) -> Self {
        Self::with_fs(gzip, brotli, RealFileSystem)
    }
}

impl<FS: FileSystem + Sync> Measurer<FS> {
    /// Create a measurer with a custom filesystem implementation
    pub fn with_fs(gzip: bool, brotli: bool, fs: FS) -> Self {
        Self {
            gzip,
            brotli,
            show_progress: false,
            fs,
        }
    }

    /// Measure every file under `dir`.
    ///
    /// The walk order is deterministic (paths sorted); compression runs on a
    /// pool of [`MEASURE_WORKERS`] workers. Unreadable files are skipped
    /// with a warning. Disabled metrics are recorded as 0.
    pub fn measure(&self, dir: &Path, commit: String) -> Result<BundleStats> {
        let paths = walk_files(&self.fs, dir)
            .with_context(|| format!("Failed to walk output directory {}", dir.display()))?;

        let progress = if self.show_progress {
            ProgressBar::new(paths.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        let skipped: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(MEASURE_WORKERS)
            .build()
            .context("Failed to build measurement worker pool")?;

        let files: Vec<FileStats> = pool.install(|| {
            paths
                .par_iter()
                .filter_map(|rel| {
                    let result = self.measure_file(dir, rel);
                    progress.inc(1);
                    match result {
                        Ok(stats) => Some(stats),
                        Err(err) => {
                            skipped.lock().push(format!("{}: {}", rel, err));
                            None
                        }
                    }
                })
                .collect()
        });
        progress.finish_and_clear();

        for entry in skipped.into_inner() {
            warn!("Skipped unreadable file {}", entry);
        }

        Ok(BundleStats::new(files, commit))
    }

    fn measure_file(&self, dir: &Path, rel: &str) -> std::io::Result<FileStats> {
        let data = self.fs.read(&dir.join(rel))?;
        let gzip = if self.gzip { gzip_size(&data)? } else { 0 };
        let brotli = if self.brotli { brotli_size(&data)? } else { 0 };

        Ok(FileStats {
            path: rel.to_string(),
            name: rel.rsplit('/').next().unwrap_or(rel).to_string(),
            size: data.len() as u64,
            gzip,
            brotli,
        })
    }
}

/// Collect relative file paths under `root`, sorted for determinism
fn walk_files<FS: FileSystem>(fs: &FS, root: &Path) -> std::io::Result<Vec<String>> {
    let mut paths = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs.read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if let Ok(rel) = path.strip_prefix(root) {
                paths.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    paths.sort();
    Ok(paths)
}

/// Sink that counts bytes written through it
#[derive(Default)]
struct ByteCounter {
    bytes: u64,
}

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn gzip_size(data: &[u8]) -> std::io::Result<u64> {
    let mut encoder =
        flate2::write::GzEncoder::new(ByteCounter::default(), flate2::Compression::default());
    encoder.write_all(data)?;
    let counter = encoder.finish()?;
    Ok(counter.bytes)
}

fn brotli_size(data: &[u8]) -> std::io::Result<u64> {
    let mut counter = ByteCounter::default();
    {
        let mut encoder = brotli::CompressorWriter::new(&mut counter, 4096, 11, 22);
        encoder.write_all(data)?;
        encoder.flush()?;
    }
    Ok(counter.bytes)
}

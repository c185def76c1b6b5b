//! Batch image jobs
//!
//! The two filesystem utilities that bracket training: background removal
//! for raw PNG shots and fixed-size resizing for JPEG crops. Both walk a
//! directory in sorted order, process what they can, and report what they
//! skipped instead of aborting on the first bad file.

pub mod remove_bg;
pub mod resize;

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

pub use remove_bg::{BackgroundRemover, RemoveBackgroundJob};
pub use resize::ResizeJob;

/// Outcome of a batch job
#[derive(Debug, Default)]
pub struct JobReport {
    /// Number of files processed successfully
    pub processed: usize,
    /// Files that failed, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

impl JobReport {
    /// Total number of files the job looked at
    pub fn total(&self) -> usize {
        self.processed + self.skipped.len()
    }
}

/// List the files directly under `dir` with one of the given extensions,
/// sorted by file name
pub(crate) fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {:?}", dir);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if extensions.contains(&ext.as_str()) {
                files.push(path.to_path_buf());
            }
        }
    }

    Ok(files)
}

//! Parallel file processing utilities.
//!
//! Scanning input files is CPU-bound (regex over every line), so several
//! files are processed concurrently with Rayon. A failing file does not stop
//! the others: each outcome is returned to the caller, which decides whether
//! to skip or abort.

use crate::utils::progress::ProgressBar;
use anyhow::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Result of processing a single file
#[derive(Debug)]
pub struct FileProcessResult<T> {
    pub file_path: PathBuf,
    pub data: Result<T>,
}

/// Process multiple files in parallel and fold the per-file results.
///
/// # Arguments
/// * `files` - List of file paths to process
/// * `progress` - Bar advanced by one per completed file
/// * `processor` - Function that processes a single file
/// * `combiner` - Function that combines results from all files
pub fn process_files_parallel<T, F, C, R>(
    files: &[PathBuf],
    progress: &ProgressBar,
    processor: F,
    combiner: C,
) -> R
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Send + Sync,
    C: FnOnce(Vec<FileProcessResult<T>>) -> R,
{
    let results: Vec<FileProcessResult<T>> = files
        .par_iter()
        .map(|file_path| {
            let data = processor(file_path);
            progress.inc(1);
            FileProcessResult {
                file_path: file_path.clone(),
                data,
            }
        })
        .collect();

    combiner(results)
}

//! Input sources and the extraction driver.
//!
//! A command-line argument is a directory, a file, or a raw comma-separated
//! list of addresses. No arguments at all means stdin. Files are scanned in
//! parallel; a file that cannot be parsed is reported and skipped so one bad
//! input does not lose the rest of the run.

use super::bogon::is_bogon;
use super::parsers::{parser_for, IpParser, PlainTextParser};
use super::patterns::parse_ip;
use super::tally::IpTally;
use super::ExtractError;
use crate::utils::format::format_number;
use crate::utils::parallel::process_files_parallel;
use crate::utils::progress::ProgressBar;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// One input to extract addresses from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Stdin,
    File(PathBuf),
    Directory(PathBuf),
    /// Comma-separated address list given directly on the command line.
    Raw(String),
}

impl DataSource {
    /// Directory if `arg` names one, file if it names a file, otherwise raw
    /// address text.
    pub fn classify(arg: &str) -> Self {
        let path = Path::new(arg);
        if path.is_dir() {
            Self::Directory(path.to_path_buf())
        } else if path.is_file() {
            Self::File(path.to_path_buf())
        } else {
            Self::Raw(arg.to_string())
        }
    }

    /// Classifies every argument; an empty list means stdin.
    pub fn from_args(args: &[String]) -> Vec<Self> {
        if args.is_empty() {
            vec![Self::Stdin]
        } else {
            args.iter().map(|arg| Self::classify(arg)).collect()
        }
    }
}

/// Extraction settings shared by every source.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub ignore_bogon: bool,
    pub progress: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ignore_bogon: true,
            progress: false,
        }
    }
}

/// Every regular file under `dir`, recursively, in sorted order.
///
/// Symlinks to files are included. Symlinks to directories are not
/// followed, so a link back up the tree cannot repeat files.
///
/// Unreadable subdirectories are skipped with a warning; only a failure to
/// read `dir` itself is an error.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    let mut first = true;

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if first => {
                return Err(ExtractError::Read {
                    path: current,
                    message: e.to_string(),
                })
            }
            Err(e) => {
                warn!("Skipping directory {}: {}", current.display(), e);
                continue;
            }
        };
        first = false;

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            } else if file_type.is_symlink() {
                // Linked files are scanned, linked directories are not entered
                if path.is_file() {
                    files.push(path);
                } else {
                    debug!("Not following directory link {}", path.display());
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn scan_file(path: &Path, ignore_bogon: bool) -> Result<IpTally, ExtractError> {
    let parser = parser_for(path, ignore_bogon);
    debug!("Scanning {} as {}", path.display(), parser.name());
    let mut tally = IpTally::new();
    parser.parse_path(path, &mut tally)?;
    Ok(tally)
}

/// Scans `files` in parallel and merges their tallies in file order.
pub fn scan_files(files: &[PathBuf], options: &ExtractOptions) -> IpTally {
    let progress = ProgressBar::maybe(options.progress, files.len(), "Scanning files");
    let ignore_bogon = options.ignore_bogon;

    let tally = process_files_parallel(
        files,
        &progress,
        |path| Ok(scan_file(path, ignore_bogon)?),
        |results| {
            let mut combined = IpTally::new();
            for result in results {
                match result.data {
                    Ok(tally) => combined.merge(tally),
                    Err(e) => warn!("Skipping {}: {:#}", result.file_path.display(), e),
                }
            }
            combined
        },
    );

    progress.finish();
    tally
}

fn scan_raw(value: &str, ignore_bogon: bool) -> IpTally {
    let mut tally = IpTally::new();
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match parse_ip(token) {
            Some(ip) if ignore_bogon && is_bogon(ip) => {
                debug!("Ignoring bogon {}", ip);
            }
            Some(ip) => tally.record(ip.to_string()),
            None => warn!(
                "Ignoring '{}': not a file, directory or IP address",
                token
            ),
        }
    }
    tally
}

fn scan_stdin(options: &ExtractOptions) -> Result<IpTally, ExtractError> {
    debug!("Reading addresses from stdin");
    let mut tally = IpTally::new();
    PlainTextParser::new(options.ignore_bogon)
        .parse_reader(Box::new(std::io::stdin()), &mut tally)?;
    Ok(tally)
}

/// Extracts the addresses of one source.
pub fn extract_source(
    source: &DataSource,
    options: &ExtractOptions,
) -> Result<IpTally, ExtractError> {
    match source {
        DataSource::Stdin => scan_stdin(options),
        DataSource::File(path) => Ok(scan_files(std::slice::from_ref(path), options)),
        DataSource::Directory(dir) => {
            let files = collect_files(dir)?;
            info!(
                "Found {} files under {}",
                format_number(files.len()),
                dir.display()
            );
            Ok(scan_files(&files, options))
        }
        DataSource::Raw(value) => Ok(scan_raw(value, options.ignore_bogon)),
    }
}

/// Extracts every source and merges the results in source order.
pub fn extract_all(
    sources: &[DataSource],
    options: &ExtractOptions,
) -> Result<IpTally, ExtractError> {
    let mut tally = IpTally::new();
    for source in sources {
        tally.merge(extract_source(source, options)?);
    }
    info!(
        "Extracted {} unique addresses ({} occurrences)",
        format_number(tally.len()),
        format_number(tally.total())
    );
    Ok(tally)
}

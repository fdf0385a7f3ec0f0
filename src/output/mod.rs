//! Report writers.
//!
//! Records are written as CSV, a JSON array, or JSON lines, either to a file
//! or to stdout. A header list selects and orders the columns; without one
//! the keys of the first record are used.

pub mod csv;
pub mod json;

use crate::resolvers::Record;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Report serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    #[default]
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        })
    }
}

/// Where the report goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Destination::Stdout, Destination::File)
    }

    fn open(&self) -> Result<Box<dyn Write>> {
        match self {
            Destination::Stdout => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
            Destination::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Stdout => f.write_str("stdout"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Header row to use: `headers` if given, otherwise the first record's keys.
pub fn resolve_headers(records: &[Record], headers: &[String]) -> Vec<String> {
    if !headers.is_empty() {
        return headers.to_vec();
    }
    records
        .first()
        .map(|record| record.keys().cloned().collect())
        .unwrap_or_default()
}

/// Serializes `records` into `writer`.
pub fn write_to<W: Write>(
    writer: W,
    records: &[Record],
    headers: &[String],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => self::csv::write_csv(writer, records, headers),
        OutputFormat::Json => self::json::write_json(writer, records, headers, false),
        OutputFormat::Jsonl => self::json::write_json(writer, records, headers, true),
    }
}

/// Writes the report to `destination`.
pub fn write_records(
    records: &[Record],
    headers: &[String],
    format: OutputFormat,
    destination: &Destination,
) -> Result<()> {
    let writer = destination.open()?;
    write_to(writer, records, headers, format)
        .with_context(|| format!("Failed to write {} report to {}", format, destination))
}

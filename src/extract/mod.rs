//! IP address extraction.
//!
//! Sources (files, directories, stdin, raw values) are scanned by a parser
//! chosen from the file extension. Every candidate is validated and, unless
//! bogons are requested, filtered through [`bogon::is_bogon`] before landing in
//! an [`tally::IpTally`].
//!
//! - [`patterns`] - IPv4/IPv6 regular expressions and candidate scanning
//! - [`bogon`] - Non-routable address classification
//! - [`tally`] - Ordered occurrence counts
//! - [`parsers`] - Plain text, XLSX and EVTX parsers
//! - [`sources`] - Input classification, directory walking, parallel scanning

pub mod bogon;
pub mod parsers;
pub mod patterns;
pub mod sources;
pub mod tally;

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading one input.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to read input stream: {0}")]
    Stream(String),

    #[error("{parser} input cannot be read from a stream")]
    StreamUnsupported { parser: &'static str },

    #[error("Invalid XLSX workbook {path}: {message}")]
    Xlsx { path: PathBuf, message: String },

    #[error("Invalid EVTX file {path}: {message}")]
    Evtx { path: PathBuf, message: String },
}

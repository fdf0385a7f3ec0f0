//! Utility functions and helpers.
//!
//! This module provides common functionality used across commands:
//!
//! - [`format`] - Number and duration formatting
//! - [`logging`] - Logger setup (stderr plus log file)
//! - [`parallel`] - Parallel per-file processing
//! - [`progress`] - Progress tracking and display utilities
//! - [`reader`] - Smart file reader with automatic decompression
//!
//! # Examples
//!
//! ## Reading compressed files
//!
//! ```no_run
//! use ip_context_tools::utils::reader::open_file;
//! use std::io::{BufRead, BufReader};
//!
//! // Gzip and zstd input is detected from the file signature
//! let reader = open_file("access.log.gz").unwrap();
//! let buf_reader = BufReader::new(reader);
//! ```

pub mod format;
pub mod logging;
pub mod parallel;
pub mod progress;
pub mod reader;

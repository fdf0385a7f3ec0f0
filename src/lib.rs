//! # IP Context Tools
//!
//! Command-line tools for pulling IP addresses out of logs, spreadsheets and
//! Windows event logs and enriching them with geolocation and reputation
//! data from ip-api.com and VirusTotal.
//!
//! ## Overview
//!
//! A run has three stages:
//!
//! 1. **Extraction** - every input is scanned for IPv4 and IPv6 addresses.
//!    Matches are validated, bogon addresses (private, loopback, reserved,
//!    documentation ranges, ...) are dropped unless asked for, and each
//!    distinct address is counted.
//! 2. **Resolution** - the distinct addresses are looked up through one or
//!    both backends. Requests are sent one at a time and paced to stay
//!    within each provider's rate limits; records from several backends are
//!    merged per address.
//! 3. **Output** - the records are written as CSV, a JSON array, or JSON
//!    lines, to a file or stdout.
//!
//! ## Features
//!
//! - **Input formats** - plain text and logs (with transparent `.gz`/`.zst`
//!   decompression), `.xlsx` workbooks and `.evtx` event logs
//! - **Input sources** - files, whole directory trees (scanned in parallel),
//!   stdin, or addresses given directly on the command line
//! - **Backends** - ip-api.com (free or pro endpoint) and VirusTotal
//! - **Rate limiting** - header-driven pacing, bounded retries, failure
//!   records instead of aborted runs
//! - **Config file** - API keys and defaults in `ip-context.toml`
//! - **Shell completion** for bash, zsh, fish, powershell, and elvish
//!
//! ## Architecture
//!
//! - [`extract`] - Address patterns, bogon filter, file parsers and input sources
//! - [`resolvers`] - Lookup backends, pacing/retry and record merging
//! - [`output`] - CSV and JSON report writers
//! - [`commands`] - Command implementations
//! - [`config`] - Config file discovery and parsing
//! - [`utils`] - Shared utilities (parallel processing, progress, logging)
//!
//! ## Example Usage
//!
//! ```bash
//! # Resolve every address in a web server log
//! ip-context resolve access.log
//!
//! # Scan a directory tree, CSV report
//! ip-context resolve /var/log/ -t csv -w report.csv --progress
//!
//! # Add VirusTotal reputation data
//! ip-context resolve suspicious.log --backend all --vt-api-key $VT_KEY
//!
//! # Count addresses only, no lookups
//! ip-context extract Security.evtx
//! ```

pub mod commands;
pub mod config;
pub mod extract;
pub mod output;
pub mod resolvers;
pub mod utils;

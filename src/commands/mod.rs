//! Command implementations.
//!
//! - [`resolve`] - Extract addresses and look them up via ip-api.com and/or VirusTotal
//! - [`extract`] - Extract and count addresses without any lookups
//!
//! Both commands take the same input and output options ([`CommonArgs`]).
//! Values missing on the command line are filled in from the config file
//! (see [`crate::config`]) before a command runs.

pub mod extract;
pub mod resolve;

use crate::config::{split_fields, Config, FieldList};
use crate::extract::sources::{DataSource, ExtractOptions};
use crate::output::{Destination, OutputFormat};
use crate::utils::logging::DEFAULT_LOG_FILE;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Input and output options shared by every command that reads data.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Files, directories, or comma-separated IP addresses (stdin when omitted)
    #[arg(value_name = "DATA")]
    pub data: Vec<String>,

    /// Comma-separated list of fields to report
    #[arg(short, long)]
    pub fields: Option<String>,

    /// Output format
    #[arg(short = 't', long, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short = 'w', long)]
    pub output_file: Option<PathBuf>,

    /// Keep private, reserved and other bogon addresses
    #[arg(short = 'b', long)]
    pub include_bogon: bool,

    /// Config file (default: search the usual locations)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show progress bars
    #[arg(short, long)]
    pub progress: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log file
    #[arg(short, long)]
    pub log: Option<PathBuf>,
}

/// Effective input/output settings after merging the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<DataSource>,
    /// Requested columns; empty means the command's defaults.
    pub fields: Vec<String>,
    pub output_format: OutputFormat,
    pub destination: Destination,
    pub include_bogon: bool,
    pub progress: bool,
    pub verbose: bool,
    pub log_file: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            ignore_bogon: !self.include_bogon,
            progress: self.progress,
        }
    }
}

impl CommonArgs {
    /// Finds and parses the config file named by `--config` or found in
    /// the default locations.
    pub fn load_config(&self) -> Result<(Option<PathBuf>, Config)> {
        let discovered =
            Config::discover(self.config.as_deref()).context("Failed to load configuration")?;
        Ok(match discovered {
            Some((path, config)) => (Some(path), config),
            None => (None, Config::default()),
        })
    }

    /// Command-line values over `config` over defaults.
    pub fn settings(&self, config: &Config, config_path: Option<PathBuf>) -> Settings {
        let main = &config.main;

        let fields = match &self.fields {
            Some(text) => split_fields(text),
            None => main.fields.as_ref().map(FieldList::to_vec).unwrap_or_default(),
        };

        Settings {
            sources: DataSource::from_args(&self.data),
            fields,
            output_format: self.output_format.or(main.output_format).unwrap_or_default(),
            destination: Destination::from_option(self.output_file.clone()),
            include_bogon: self.include_bogon || main.include_bogon.unwrap_or(false),
            progress: self.progress || main.progress.unwrap_or(false),
            verbose: self.verbose || main.verbose.unwrap_or(false),
            log_file: self
                .log
                .clone()
                .or_else(|| main.log.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            config_path,
        }
    }
}

//! Configuration file support.
//!
//! Settings may come from a TOML file so API keys and preferred columns do
//! not have to be repeated on every run:
//!
//! ```toml
//! [main]
//! fields = ["query", "count", "country", "asn"]
//! output_format = "csv"
//! backend = "all"
//!
//! [backends]
//! ip_api_key = "..."
//! virustotal_api_key = "..."
//! ```
//!
//! Command-line flags win over the file, the file wins over environment
//! variables, and environment variables win over built-in defaults.

use crate::output::OutputFormat;
use crate::resolvers::Backend;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names searched for, in order, in every config directory.
pub const CONFIG_FILE_NAMES: &[&str] = &["ip-context.toml", ".ip-context.toml"];

/// Environment variable holding the ip-api pro key.
pub const ENV_API_KEY: &str = "IP_CONTEXT_API_KEY";

/// Environment variable holding the VirusTotal key.
pub const ENV_VT_API_KEY: &str = "IP_CONTEXT_VT_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Column list, written either as a TOML array or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldList {
    List(Vec<String>),
    Csv(String),
}

impl FieldList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            FieldList::List(fields) => fields.clone(),
            FieldList::Csv(text) => split_fields(text),
        }
    }
}

/// Splits a comma-separated column list, dropping blanks.
pub fn split_fields(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// `[main]` section: defaults for command-line options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MainConfig {
    pub fields: Option<FieldList>,
    pub output_format: Option<OutputFormat>,
    pub progress: Option<bool>,
    pub include_bogon: Option<bool>,
    pub log: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub lang: Option<String>,
    pub single: Option<bool>,
    pub backend: Option<Backend>,
}

/// `[backends]` section: credentials and request tuning.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendsConfig {
    pub ip_api_key: Option<String>,
    pub virustotal_api_key: Option<String>,
    pub max_retries: Option<u32>,
    pub batch_size: Option<usize>,
    pub virustotal_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub main: MainConfig,
    pub backends: BackendsConfig,
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Loads `explicit` if given (it must exist), otherwise the first file
    /// found in [`search_paths`]. `None` when nothing is configured.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(path) = explicit {
            return Ok(Some((path.to_path_buf(), Self::load(path)?)));
        }
        match search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok(Some((path, config)))
            }
            None => Ok(None),
        }
    }
}

/// Config directories in lookup order: working directory, home directory,
/// `~/.config/ip-context`, `/etc/ip-context`.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs_list = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        dirs_list.push(cwd);
    }
    if let Some(home) = dirs::home_dir() {
        dirs_list.push(home.clone());
        dirs_list.push(home.join(".config").join("ip-context"));
    }
    dirs_list.push(PathBuf::from("/etc/ip-context"));
    dirs_list
}

/// Every candidate config file path, in lookup order.
pub fn search_paths() -> Vec<PathBuf> {
    search_dirs()
        .into_iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .collect()
}

/// First non-blank of: command-line value, config value, environment
/// variable `env_var`.
pub fn resolve_key(cli: Option<&str>, config: Option<&str>, env_var: &str) -> Option<String> {
    let from_env = env::var(env_var).ok();
    let key = [cli, config, from_env.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string);
    key
}

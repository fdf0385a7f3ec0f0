//! Address resolution command.
//!
//! Extracts every IP address from the given inputs, looks each distinct
//! address up through the selected backend(s), merges the per-backend
//! records and writes the report with an occurrence `count` per address.
//!
//! # Usage
//!
//! ```bash
//! # Resolve the addresses in a log file via ip-api.com (JSON lines on stdout)
//! ip-context resolve access.log
//!
//! # Whole directory tree, CSV report, progress bars
//! ip-context resolve /var/log/nginx -t csv -w report.csv -p
//!
//! # Geolocation and VirusTotal reputation together
//! ip-context resolve 8.8.8.8,1.1.1.1 --backend all --vt-api-key $KEY
//!
//! # From stdin
//! cat firewall.log | ip-context resolve -f query,count,country,as
//! ```
//!
//! # Rate limits
//!
//! The free ip-api.com endpoint is paced from the `X-Rl`/`X-Ttl` headers it
//! returns; the pro endpoint (used when an API key is given) is not.
//! VirusTotal's public API allows four requests a minute, so lookups are
//! spaced 15 seconds apart unless `virustotal_interval_secs` says otherwise.
//! Addresses whose lookup still fails after the retries are reported with
//! `status = "failed"`.

use super::{CommonArgs, Settings};
use crate::config::{resolve_key, Config, ENV_API_KEY, ENV_VT_API_KEY};
use crate::extract::sources::extract_all;
use crate::extract::tally::IpTally;
use crate::output::{write_records, Destination};
use crate::resolvers::ipapi::{self, IpApiResolver, BATCH_LIMIT};
use crate::resolvers::merge::{attach_counts, merge_records};
use crate::resolvers::virustotal::{self, VirusTotalResolver, DEFAULT_INTERVAL};
use crate::resolvers::{Backend, QueryMode, Record, Resolver, RetryPolicy};
use crate::utils::format::format_number;
use crate::utils::progress::ProgressBar;
use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info, warn};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Options of the `resolve` command.
#[derive(Debug, Clone, Default, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// One request per address instead of batches
    #[arg(short, long)]
    pub single: bool,

    /// Response language: en, de, es, pt-BR, fr, ja, zh-CN, ru
    #[arg(long)]
    pub lang: Option<String>,

    /// Lookup service(s) to query
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// ip-api.com pro key (or IP_CONTEXT_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// VirusTotal key (or IP_CONTEXT_VT_API_KEY)
    #[arg(long)]
    pub vt_api_key: Option<String>,
}

/// Effective `resolve` settings.
#[derive(Debug, Clone)]
pub struct ResolveSettings {
    pub common: Settings,
    pub backend: Backend,
    pub mode: QueryMode,
    pub lang: String,
    pub api_key: Option<String>,
    pub vt_api_key: Option<String>,
    pub retry: RetryPolicy,
    pub batch_size: usize,
    pub vt_interval: Duration,
    /// ip-api.com base URL override.
    pub ip_api_url: Option<String>,
    /// VirusTotal report URL override.
    pub virustotal_url: Option<String>,
}

impl ResolveArgs {
    /// Command-line values over `config` over environment over defaults.
    pub fn settings(&self, config: &Config, config_path: Option<PathBuf>) -> ResolveSettings {
        let main = &config.main;
        let backends = &config.backends;

        let single = self.single || main.single.unwrap_or(false);

        ResolveSettings {
            common: self.common.settings(config, config_path),
            backend: self.backend.or(main.backend).unwrap_or_default(),
            mode: if single { QueryMode::Single } else { QueryMode::Batch },
            lang: self
                .lang
                .clone()
                .or_else(|| main.lang.clone())
                .unwrap_or_else(|| "en".to_string()),
            api_key: resolve_key(
                self.api_key.as_deref(),
                backends.ip_api_key.as_deref(),
                ENV_API_KEY,
            ),
            vt_api_key: resolve_key(
                self.vt_api_key.as_deref(),
                backends.virustotal_api_key.as_deref(),
                ENV_VT_API_KEY,
            ),
            retry: backends
                .max_retries
                .map(RetryPolicy::new)
                .unwrap_or_default(),
            batch_size: backends.batch_size.unwrap_or(BATCH_LIMIT),
            vt_interval: backends
                .virustotal_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_INTERVAL),
            ip_api_url: None,
            virustotal_url: None,
        }
    }
}

impl ResolveSettings {
    /// Report columns: the requested fields, or the backend defaults.
    pub fn headers(&self) -> Vec<String> {
        if !self.common.fields.is_empty() {
            return self.common.fields.clone();
        }
        default_fields(self.backend)
    }
}

/// Default columns for `backend`; for several backends the union, in
/// backend order.
pub fn default_fields(backend: Backend) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut add = |names: &[&str]| {
        for name in names {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }
    };
    if backend.uses_ipapi() {
        add(ipapi::DEFAULT_FIELDS);
    }
    if backend.uses_virustotal() {
        add(virustotal::DEFAULT_FIELDS);
    }
    fields
}

/// Builds the resolvers for the selected backends, ip-api first.
///
/// A missing VirusTotal key fails here, before anything is sent.
pub fn build_resolvers(settings: &ResolveSettings) -> Result<Vec<Box<dyn Resolver>>> {
    let fields = settings.headers();
    let mut resolvers: Vec<Box<dyn Resolver>> = Vec::new();

    if settings.backend.uses_ipapi() {
        let mut resolver = IpApiResolver::new(settings.api_key.clone())
            .context("Failed to set up ip-api.com resolver")?
            .with_fields(&fields)
            .with_lang(&settings.lang)
            .with_batch_size(settings.batch_size)
            .with_retry(settings.retry);
        if let Some(url) = &settings.ip_api_url {
            resolver = resolver.with_base_url(url.as_str());
        }
        resolvers.push(Box::new(resolver));
    }

    if settings.backend.uses_virustotal() {
        let mut resolver = VirusTotalResolver::new(settings.vt_api_key.clone())?
            .with_fields(&fields)
            .with_interval(settings.vt_interval)
            .with_retry(settings.retry);
        if let Some(url) = &settings.virustotal_url {
            resolver = resolver.with_url(url.as_str());
        }
        resolvers.push(Box::new(resolver));
    }

    Ok(resolvers)
}

/// Runs every resolver over the tally's addresses and merges the results.
pub async fn resolve_tally(
    resolvers: &mut [Box<dyn Resolver>],
    tally: &IpTally,
    mode: QueryMode,
    show_progress: bool,
) -> Vec<Record> {
    let ips = tally.ips();
    let mut batches = Vec::with_capacity(resolvers.len());

    for resolver in resolvers.iter_mut() {
        info!(
            "Resolving {} addresses via {}",
            format_number(ips.len()),
            resolver.name()
        );
        let label = format!("Resolving via {}", resolver.name());
        let progress = ProgressBar::maybe(show_progress, ips.len(), &label);
        let records = resolver.query(&ips, mode, &progress).await;
        progress.finish();
        debug!("{} returned {} records", resolver.name(), records.len());
        batches.push(records);
    }

    let mut records = merge_records(batches);
    attach_counts(&mut records, tally);
    records
}

fn is_failed(record: &Record) -> bool {
    matches!(
        record.get("status").and_then(Value::as_str),
        Some("fail") | Some("failed")
    )
}

pub async fn run(settings: &ResolveSettings) -> Result<()> {
    if let Some(path) = &settings.common.config_path {
        info!("Using config file {}", path.display());
    }

    let mut resolvers = build_resolvers(settings)?;

    let tally = extract_all(&settings.common.sources, &settings.common.extract_options())
        .context("Failed to extract IP addresses")?;

    let records = if tally.is_empty() {
        warn!("No IP addresses found in the input");
        Vec::new()
    } else {
        resolve_tally(&mut resolvers, &tally, settings.mode, settings.common.progress).await
    };

    let headers = settings.headers();
    write_records(
        &records,
        &headers,
        settings.common.output_format,
        &settings.common.destination,
    )?;

    let failed = records.iter().filter(|r| is_failed(r)).count();
    eprintln!();
    eprintln!("=== Summary ===");
    eprintln!("Unique addresses: {}", format_number(tally.len()));
    eprintln!("Total occurrences: {}", format_number(tally.total()));
    eprintln!("Resolved: {}", format_number(records.len() - failed));
    if failed > 0 {
        eprintln!("Failed: {}", format_number(failed));
    }
    if let Destination::File(path) = &settings.common.destination {
        eprintln!(
            "{} written to: {}",
            settings.common.output_format.to_string().to_uppercase(),
            path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::ResolverError;
    use std::path::Path;

    fn settings_for(backend: Backend) -> ResolveSettings {
        let args = ResolveArgs {
            backend: Some(backend),
            vt_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        args.settings(&Config::default(), None)
    }

    #[test]
    fn test_default_fields_union() {
        let ip_api = default_fields(Backend::IpApi);
        assert_eq!(ip_api[0], "query");
        assert!(ip_api.contains(&"count".to_string()));

        let all = default_fields(Backend::All);
        assert_eq!(&all[..ip_api.len()], &ip_api[..]);
        assert!(all.contains(&"asn".to_string()));
        assert_eq!(all.iter().filter(|f| *f == "query").count(), 1);
        assert_eq!(all.iter().filter(|f| *f == "country").count(), 1);
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::from_toml(
            "[main]\nsingle = true\nlang = \"de\"\nbackend = \"virustotal\"\n\n[backends]\nmax_retries = 1\nbatch_size = 10\nvirustotal_interval_secs = 2\n",
            Path::new("test.toml"),
        )
        .unwrap();
        let settings = ResolveArgs::default().settings(&config, None);

        assert_eq!(settings.mode, QueryMode::Single);
        assert_eq!(settings.lang, "de");
        assert_eq!(settings.backend, Backend::Virustotal);
        assert_eq!(settings.retry, RetryPolicy::new(1));
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.vt_interval, Duration::from_secs(2));
        assert_eq!(settings.headers(), default_fields(Backend::Virustotal));
    }

    #[test]
    fn test_build_resolvers_order() {
        let resolvers = build_resolvers(&settings_for(Backend::All)).unwrap();
        let names: Vec<&str> = resolvers.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["ip-api", "virustotal"]);

        let resolvers = build_resolvers(&settings_for(Backend::IpApi)).unwrap();
        assert_eq!(resolvers.len(), 1);
    }

    #[test]
    fn test_missing_virustotal_key_is_fatal() {
        let mut settings = settings_for(Backend::Virustotal);
        settings.vt_api_key = None;

        let err = build_resolvers(&settings).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ResolverError>(),
            Some(ResolverError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_failed_status() {
        let failed = crate::resolvers::failure_record("8.8.8.8", "timeout");
        assert!(is_failed(&failed));

        let mut ok = Record::new();
        ok.insert("status".into(), "success".into());
        assert!(!is_failed(&ok));
    }
}

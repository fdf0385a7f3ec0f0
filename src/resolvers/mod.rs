//! Resolution of IP addresses through remote lookup services.
//!
//! Every backend implements [`Resolver`]. Requests are issued one at a time;
//! pacing between them is handled by a [`Throttle`] and failed requests are
//! retried under a [`RetryPolicy`]. When a request still fails after the
//! retries, the affected addresses are returned as failure records rather
//! than aborting the run.
//!
//! - [`ipapi`] - ip-api.com geolocation (free and pro endpoints)
//! - [`virustotal`] - VirusTotal v2 IP address reports
//! - [`merge`] - Combining records from several backends

pub mod ipapi;
pub mod merge;
pub mod virustotal;

use crate::utils::format::format_wait;
use crate::utils::progress::ProgressBar;
use async_trait::async_trait;
use clap::ValueEnum;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// One resolved address: provider fields keyed by name, always with `query`.
pub type Record = Map<String, Value>;

/// Errors raised while setting up a resolver.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("{backend} requires an API key; pass {flag}, set it in the config file or export {env}")]
    MissingApiKey {
        backend: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Which lookup services to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// ip-api.com geolocation.
    #[default]
    IpApi,
    /// VirusTotal reputation; needs an API key.
    Virustotal,
    /// Both, ip-api first.
    All,
}

impl Backend {
    pub fn uses_ipapi(self) -> bool {
        matches!(self, Backend::IpApi | Backend::All)
    }

    pub fn uses_virustotal(self) -> bool {
        matches!(self, Backend::Virustotal | Backend::All)
    }
}

/// How a list of addresses is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Grouped requests where the backend supports them.
    #[default]
    Batch,
    /// One request per address.
    Single,
}

/// Outcome of one HTTP exchange.
#[derive(Debug)]
pub(crate) enum Reply<T> {
    Done(T),
    /// Transient failure (rate limit, transport error); worth another try.
    Retry(String),
    /// Permanent failure for the request.
    Fail(String),
}

/// A remote lookup service.
#[async_trait]
pub trait Resolver: Send {
    /// Backend name for log messages.
    fn name(&self) -> &'static str;

    /// Resolves one address.
    async fn resolve_single(&mut self, ip: &str) -> Record;

    /// Resolves many addresses, one record per address, in input order.
    async fn resolve_batch(&mut self, ips: &[String], progress: &ProgressBar) -> Vec<Record>;

    /// Dispatches to [`Resolver::resolve_batch`] or one
    /// [`Resolver::resolve_single`] call per address.
    async fn query(
        &mut self,
        ips: &[String],
        mode: QueryMode,
        progress: &ProgressBar,
    ) -> Vec<Record> {
        match mode {
            QueryMode::Batch => self.resolve_batch(ips, progress).await,
            QueryMode::Single => {
                let mut records = Vec::with_capacity(ips.len());
                for ip in ips {
                    records.push(self.resolve_single(ip).await);
                    progress.inc(1);
                }
                records
            }
        }
    }
}

/// Earliest instant the next request may be sent.
#[derive(Debug)]
pub struct Throttle {
    next: Instant,
    buffer: Duration,
}

impl Throttle {
    /// `buffer` is added to every sleep so the provider's window has surely
    /// rolled over.
    pub fn new(buffer: Duration) -> Self {
        Self {
            next: Instant::now(),
            buffer,
        }
    }

    /// Time left before the next request is allowed.
    pub fn remaining(&self) -> Duration {
        self.next.saturating_duration_since(Instant::now())
    }

    /// Sleeps until the next request is allowed.
    pub async fn wait(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            let wait = remaining + self.buffer;
            info!("Sleeping for {} due to rate limiting", format_wait(wait));
            sleep(wait).await;
        }
        self.next = Instant::now();
    }

    /// Pushes the next allowed instant at least `duration` into the future.
    pub fn defer(&mut self, duration: Duration) {
        let until = Instant::now() + duration;
        if until > self.next {
            self.next = until;
        }
    }

    /// Enforces a fixed `interval` between this request and the next one.
    pub fn space(&mut self, interval: Duration) {
        self.next = Instant::now() + interval;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Count-bounded retries with a linearly growing pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause before the first retry; the n-th retry waits n times as long.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether a request that already failed `attempt` times may be retried.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Pause before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Record standing in for an address that could not be resolved.
pub fn failure_record(ip: &str, message: &str) -> Record {
    let mut record = Record::new();
    record.insert("query".into(), Value::String(ip.to_string()));
    record.insert("status".into(), Value::String("failed".into()));
    record.insert("message".into(), Value::String(message.to_string()));
    record
}

/// Makes an indicator safe to paste: `evil.example` -> `evil[.]example`.
pub fn defang(ioc: &str) -> String {
    ioc.replace('.', "[.]")
}

/// Reads a numeric response header, ignoring malformed values.
pub(crate) fn header_value<T: FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

pub(crate) fn http_client() -> Result<reqwest::Client, ResolverError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("ip-context/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

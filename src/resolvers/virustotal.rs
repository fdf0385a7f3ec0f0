//! VirusTotal v2 IP address report backend.
//!
//! There is no batch endpoint, so a batch is a sequence of single lookups.
//! The public API allows four requests a minute; requests are spaced by a
//! fixed interval and a `204` (quota exceeded) is retried after another one.

use super::{defang, failure_record, http_client, Record, Reply, Resolver};
use super::{ResolverError, RetryPolicy, Throttle};
use crate::config::ENV_VT_API_KEY;
use crate::utils::progress::ProgressBar;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;

pub const REPORT_URL: &str = "https://www.virustotal.com/vtapi/v2/ip-address/report";

/// Public API pacing: 4 requests per minute.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

pub const DEFAULT_FIELDS: &[&str] = &[
    "query", "count", "asn", "country", "subnet", "resolution_count",
    "detected_sample_count", "undetected_sample_count", "detected_url_count",
    "undetected_url_count", "status", "message",
];

const DETECTED_SAMPLE_KEYS: [&str; 3] = [
    "detected_communicating_samples",
    "detected_downloaded_samples",
    "detected_referrer_samples",
];

const UNDETECTED_SAMPLE_KEYS: [&str; 3] = [
    "undetected_communicating_samples",
    "undetected_downloaded_samples",
    "undetected_referrer_samples",
];

pub struct VirusTotalResolver {
    client: Client,
    url: String,
    api_key: String,
    fields: Vec<String>,
    interval: Duration,
    retry: RetryPolicy,
    throttle: Throttle,
}

impl VirusTotalResolver {
    /// Fails without a (non-empty) key; nothing is sent in that case.
    pub fn new(api_key: Option<String>) -> Result<Self, ResolverError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ResolverError::MissingApiKey {
                backend: "VirusTotal",
                flag: "--vt-api-key",
                env: ENV_VT_API_KEY,
            })?;

        Ok(Self {
            client: http_client()?,
            url: REPORT_URL.to_string(),
            api_key,
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            interval: DEFAULT_INTERVAL,
            retry: RetryPolicy::default(),
            throttle: Throttle::default(),
        })
    }

    /// Full report URL, including the path.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_fields(mut self, fields: &[String]) -> Self {
        if !fields.is_empty() {
            self.fields = fields.to_vec();
        }
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    async fn send(&mut self, ip: &str) -> Reply<Value> {
        self.throttle.wait().await;
        let sent = self
            .client
            .get(&self.url)
            .query(&[("apikey", self.api_key.as_str()), ("ip", ip)])
            .send()
            .await;
        self.throttle.space(self.interval);

        let response = match sent {
            Ok(response) => response,
            Err(e) => return Reply::Retry(format!("Request failed: {}", e)),
        };

        match response.status() {
            StatusCode::OK => match response.json::<Value>().await {
                Ok(body) => Reply::Done(body),
                Err(e) => Reply::Fail(format!("Invalid response: {}", e)),
            },
            StatusCode::NO_CONTENT => {
                self.throttle.defer(self.interval);
                Reply::Retry("Request rate limit exceeded".to_string())
            }
            StatusCode::BAD_REQUEST => {
                Reply::Fail("Incorrect request. Please check input data".to_string())
            }
            StatusCode::FORBIDDEN => {
                Reply::Fail("Authorization error. Please check API key".to_string())
            }
            status if status.is_server_error() => {
                Reply::Retry(format!("Server error encountered: {}", status.as_u16()))
            }
            status => Reply::Fail(format!("Unknown error encountered: {}", status.as_u16())),
        }
    }
}

#[async_trait]
impl Resolver for VirusTotalResolver {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    async fn resolve_single(&mut self, ip: &str) -> Record {
        let mut attempt = 0;
        loop {
            match self.send(ip).await {
                Reply::Done(body) => return parse_report(ip, &body, &self.fields),
                Reply::Fail(message) => {
                    warn!("VirusTotal lookup of {} failed: {}", ip, message);
                    return failure_record(ip, &message);
                }
                Reply::Retry(reason) if self.retry.should_retry(attempt) => {
                    attempt += 1;
                    debug!("VirusTotal {}: {}, retry {}/{}", ip, reason, attempt, self.retry.max_retries);
                    self.throttle.defer(self.retry.delay(attempt));
                }
                Reply::Retry(reason) => {
                    let message = format!("{} after {} retries", reason, attempt);
                    warn!("VirusTotal lookup of {} failed: {}", ip, message);
                    return failure_record(ip, &message);
                }
            }
        }
    }

    async fn resolve_batch(&mut self, ips: &[String], progress: &ProgressBar) -> Vec<Record> {
        let mut records = Vec::with_capacity(ips.len());
        for ip in ips {
            records.push(self.resolve_single(ip).await);
            progress.inc(1);
        }
        records
    }
}

fn array<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

fn value_or_null(body: &Value, key: &str) -> Value {
    body.get(key).cloned().unwrap_or(Value::Null)
}

/// Splits whois text into `key: value` pairs. Lines without a colon are
/// gathered, newline-terminated, under `OtherRemarks`.
pub fn parse_whois(text: &str) -> Map<String, Value> {
    let mut remarks = String::new();
    let mut pairs = Map::new();
    for line in text.lines().filter(|l| !l.is_empty()) {
        match line.split_once(':') {
            Some((key, value)) => {
                pairs.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
            }
            None => {
                remarks.push_str(line);
                remarks.push('\n');
            }
        }
    }

    let mut whois = Map::new();
    whois.insert("OtherRemarks".into(), Value::String(remarks));
    whois.extend(pairs);
    whois
}

/// Flattens a v2 IP address report into a record.
///
/// Every requested field is present (null when the report lacks it);
/// summary fields are always added.
pub fn parse_report(query: &str, body: &Value, fields: &[String]) -> Record {
    let mut record: Record = fields.iter().map(|f| (f.clone(), Value::Null)).collect();

    let asn = match body.get("asn").filter(|v| !v.is_null()) {
        Some(asn) => {
            let asn = asn.as_str().map_or_else(|| asn.to_string(), str::to_string);
            let owner = str_field(body, "as_owner").unwrap_or("");
            format!("AS{} {}", asn, owner).trim_end().to_string()
        }
        None => String::new(),
    };

    record.insert("query".into(), Value::String(query.to_string()));
    record.insert("asn".into(), Value::String(asn));
    record.insert("continent".into(), value_or_null(body, "continent"));
    record.insert("country".into(), value_or_null(body, "country"));
    record.insert("subnet".into(), value_or_null(body, "network"));
    record.insert("status".into(), value_or_null(body, "response_code"));
    record.insert("message".into(), value_or_null(body, "verbose_msg"));
    record.insert(
        "whois".into(),
        Value::Object(parse_whois(str_field(body, "whois").unwrap_or(""))),
    );

    let resolutions = array(body, "resolutions");
    let hostnames: BTreeSet<&str> = resolutions
        .iter()
        .filter_map(|r| str_field(r, "hostname"))
        .collect();
    record.insert("resolution_count".into(), resolutions.len().into());
    record.insert("resolutions".into(), hostnames.into_iter().collect::<Vec<_>>().into());

    // The same sample can show up in several categories; positives add up.
    let mut detected_count = 0;
    let mut detected = Map::new();
    for key in DETECTED_SAMPLE_KEYS {
        let samples = array(body, key);
        detected_count += samples.len();
        for sample in samples {
            let Some(sha256) = str_field(sample, "sha256") else {
                continue;
            };
            let positives = sample.get("positives").and_then(Value::as_u64).unwrap_or(0);
            let total = detected
                .get(sha256)
                .and_then(Value::as_u64)
                .unwrap_or(0)
                + positives;
            detected.insert(sha256.to_string(), total.into());
        }
    }
    record.insert("detected_sample_count".into(), detected_count.into());
    record.insert("detected_samples".into(), Value::Object(detected));

    let mut undetected_count = 0;
    let mut undetected = BTreeSet::new();
    for key in UNDETECTED_SAMPLE_KEYS {
        let samples = array(body, key);
        undetected_count += samples.len();
        undetected.extend(samples.iter().filter_map(|s| str_field(s, "sha256")));
    }
    record.insert("undetected_sample_count".into(), undetected_count.into());
    record.insert(
        "undetected_samples".into(),
        undetected.into_iter().collect::<Vec<_>>().into(),
    );

    let detected_urls = array(body, "detected_urls");
    let urls: Map<String, Value> = detected_urls
        .iter()
        .filter_map(|u| {
            let url = str_field(u, "url")?;
            Some((defang(url), value_or_null(u, "positives")))
        })
        .collect();
    record.insert("detected_url_count".into(), detected_urls.len().into());
    record.insert("detected_urls".into(), Value::Object(urls));

    // Undetected URLs are positional: [url, sha256, positives, total, scan date].
    let undetected_urls = array(body, "undetected_urls");
    let urls: BTreeSet<String> = undetected_urls
        .iter()
        .filter_map(|u| u.get(0).and_then(Value::as_str))
        .map(defang)
        .collect();
    record.insert("undetected_url_count".into(), undetected_urls.len().into());
    record.insert(
        "undetected_urls".into(),
        urls.into_iter().collect::<Vec<_>>().into(),
    );

    record
}

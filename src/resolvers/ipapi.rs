//! ip-api.com geolocation backend.
//!
//! The free endpoint is plain HTTP and rate limited; every response carries
//! `X-Rl` (requests left in the window) and `X-Ttl` (seconds until the window
//! resets). With an API key the pro endpoint is used instead, over HTTPS and
//! without pacing.

use super::{failure_record, header_value, http_client, Record, Reply, Resolver};
use super::{ResolverError, RetryPolicy, Throttle};
use crate::utils::progress::ProgressBar;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub const FREE_URL: &str = "http://ip-api.com/";
pub const PRO_URL: &str = "https://pro.ip-api.com/";

/// Largest batch the API accepts.
pub const BATCH_LIMIT: usize = 100;

pub const SUPPORTED_LANGS: &[&str] = &["en", "de", "es", "pt-BR", "fr", "ja", "zh-CN", "ru"];

/// Report columns, in output order.
pub const DEFAULT_FIELDS: &[&str] = &[
    "query", "count", "as", "org", "isp", "continent", "country", "regionName", "city",
    "district", "zip", "mobile", "proxy", "reverse", "lat", "lon", "timezone", "status",
    "message",
];

/// Every field name the API understands. Anything else in the report
/// columns comes from another backend or is local (`count`).
pub const API_FIELDS: &[&str] = &[
    "status", "message", "continent", "continentCode", "country", "countryCode", "region",
    "regionName", "city", "district", "zip", "lat", "lon", "timezone", "offset", "currency",
    "isp", "org", "as", "asname", "reverse", "mobile", "proxy", "hosting", "query",
];

/// Headroom added to `X-Ttl` before retrying.
const TTL_MARGIN: Duration = Duration::from_millis(250);

/// Returns `lang` if the API supports it, `en` otherwise.
pub fn normalize_lang(lang: &str) -> &'static str {
    match SUPPORTED_LANGS.iter().copied().find(|l| *l == lang) {
        Some(supported) => supported,
        None => {
            warn!("Language '{}' is not supported by ip-api, using 'en'", lang);
            "en"
        }
    }
}

pub struct IpApiResolver {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    fields: Vec<String>,
    lang: String,
    batch_size: usize,
    retry: RetryPolicy,
    throttle: Throttle,
}

impl IpApiResolver {
    /// Free endpoint without a key, pro endpoint with one.
    pub fn new(api_key: Option<String>) -> Result<Self, ResolverError> {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let base_url = if api_key.is_some() { PRO_URL } else { FREE_URL };
        debug!("Using ip-api endpoint {}", base_url);

        Ok(Self {
            client: http_client()?,
            base_url: base_url.to_string(),
            api_key,
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            lang: "en".to_string(),
            batch_size: BATCH_LIMIT,
            retry: RetryPolicy::default(),
            throttle: Throttle::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_fields(mut self, fields: &[String]) -> Self {
        if !fields.is_empty() {
            self.fields = fields.to_vec();
        }
        self
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = normalize_lang(lang).to_string();
        self
    }

    /// Capped at [`BATCH_LIMIT`].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, BATCH_LIMIT);
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

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    fn paced(&self) -> bool {
        self.api_key.is_none()
    }

    /// `fields` parameter; `query` is always requested so records can be
    /// matched back. Columns the API does not know are left out.
    fn fields_param(&self) -> String {
        let mut fields: Vec<&str> = vec!["query"];
        fields.extend(
            self.fields
                .iter()
                .map(String::as_str)
                .filter(|f| *f != "query" && API_FIELDS.contains(f)),
        );
        fields.join(",")
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("fields", self.fields_param()), ("lang", self.lang.clone())];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    /// Defers the next request when the window is exhausted. A 429 without
    /// headers still counts as exhausted.
    fn observe_limits(&mut self, headers: &HeaderMap, limited: bool) {
        let remaining: Option<i64> = header_value(headers, "X-Rl");
        let remaining = if limited { remaining.or(Some(0)) } else { remaining };
        if remaining.is_some_and(|r| r < 1) {
            let ttl: u64 = header_value(headers, "X-Ttl").unwrap_or(0);
            debug!("ip-api window exhausted, resets in {}s", ttl);
            self.throttle.defer(Duration::from_secs(ttl) + TTL_MARGIN);
        }
    }

    async fn send(&mut self, request: reqwest::RequestBuilder) -> Reply<Value> {
        if self.paced() {
            self.throttle.wait().await;
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Reply::Retry(format!("Request failed: {}", e)),
        };

        let status = response.status();
        match status {
            StatusCode::OK => {
                self.observe_limits(response.headers(), false);
                match response.json::<Value>().await {
                    Ok(body) => Reply::Done(body),
                    Err(e) => Reply::Fail(format!("Invalid response: {}", e)),
                }
            }
            StatusCode::TOO_MANY_REQUESTS => {
                self.observe_limits(response.headers(), true);
                // Sleep out the window even on the unpaced endpoint.
                self.throttle.wait().await;
                Reply::Retry("Rate limit exceeded".to_string())
            }
            _ if status.is_server_error() => {
                Reply::Retry(format!("Server error encountered: {}", status.as_u16()))
            }
            _ => Reply::Fail(format!("Unknown error encountered: {}", status.as_u16())),
        }
    }

    /// Runs `request` (rebuilt for every attempt) under the retry policy.
    async fn send_with_retry<F>(&mut self, what: &str, build: F) -> Result<Value, String>
    where
        F: Fn(&Self) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let request = build(self);
            match self.send(request).await {
                Reply::Done(body) => return Ok(body),
                Reply::Fail(message) => {
                    warn!("ip-api {} failed: {}", what, message);
                    return Err(message);
                }
                Reply::Retry(reason) if self.retry.should_retry(attempt) => {
                    attempt += 1;
                    debug!("ip-api {}: {}, retry {}/{}", what, reason, attempt, self.retry.max_retries);
                    self.throttle.defer(self.retry.delay(attempt));
                    self.throttle.wait().await;
                }
                Reply::Retry(reason) => {
                    let message = format!("{} after {} retries", reason, attempt);
                    warn!("ip-api {} failed: {}", what, message);
                    return Err(message);
                }
            }
        }
    }

    async fn resolve_chunk(&mut self, chunk: &[String]) -> Vec<Record> {
        let body: Vec<Value> = chunk.iter().map(|ip| json!({ "query": ip })).collect();
        let what = format!("batch of {}", chunk.len());
        let reply = self
            .send_with_retry(&what, |this| {
                this.client
                    .post(format!("{}batch", this.base_url))
                    .query(&this.params())
                    .json(&body)
            })
            .await;

        match reply {
            Ok(Value::Array(items)) => batch_records(chunk, items),
            Ok(other) => {
                let message = format!("Invalid response: expected an array, got {}", kind(&other));
                warn!("ip-api {} failed: {}", what, message);
                chunk.iter().map(|ip| failure_record(ip, &message)).collect()
            }
            Err(message) => chunk.iter().map(|ip| failure_record(ip, &message)).collect(),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Pairs batch results with the submitted addresses. Addresses the API left
/// out become failure records.
fn batch_records(chunk: &[String], items: Vec<Value>) -> Vec<Record> {
    let mut items = items.into_iter();
    chunk
        .iter()
        .map(|ip| match items.next() {
            Some(Value::Object(mut record)) => {
                record
                    .entry("query")
                    .or_insert_with(|| Value::String(ip.clone()));
                record
            }
            _ => failure_record(ip, "Missing from batch response"),
        })
        .collect()
}

#[async_trait]
impl Resolver for IpApiResolver {
    fn name(&self) -> &'static str {
        "ip-api"
    }

    async fn resolve_single(&mut self, ip: &str) -> Record {
        let reply = self
            .send_with_retry(ip, |this| {
                this.client
                    .get(format!("{}json/{}", this.base_url, ip))
                    .query(&this.params())
            })
            .await;

        match reply {
            Ok(Value::Object(mut record)) => {
                record
                    .entry("query")
                    .or_insert_with(|| Value::String(ip.to_string()));
                record
            }
            Ok(other) => failure_record(
                ip,
                &format!("Invalid response: expected an object, got {}", kind(&other)),
            ),
            Err(message) => failure_record(ip, &message),
        }
    }

    async fn resolve_batch(&mut self, ips: &[String], progress: &ProgressBar) -> Vec<Record> {
        let mut records = Vec::with_capacity(ips.len());
        for chunk in ips.chunks(self.batch_size) {
            records.extend(self.resolve_chunk(chunk).await);
            progress.inc(chunk.len());
        }
        records
    }
}

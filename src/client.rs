//! HTTP client wrapper - pooled session, retry with backoff, response capture
//!
//! One method per verb over a shared connection pool. Transient failures
//! (429/5xx and transport errors) are retried with exponential backoff,
//! transparently to the caller. The last request and a truncated copy of the
//! last response are kept for post-hoc inspection when a test fails.

use std::sync::Mutex;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::Config;
use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, RETRY_STATUS_CODES};
use crate::envelope::Envelope;
use crate::error::{Error, Result};

/// How much of a response body is kept in logs and records
const BODY_SNIPPET_LEN: usize = 500;

/// A fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl ApiResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as arbitrary JSON. Malformed JSON is the caller's
    /// concern; the client never inspects bodies itself.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parse the body into a typed value.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parse the body as the business `{code, data, message}` envelope.
    pub fn envelope(&self) -> Result<Envelope> {
        self.json_as()
    }
}

/// Method and URL of the most recent request
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
}

/// Status and truncated body of the most recent response
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: u16,
    pub snippet: String,
}

/// Per-call knobs layered on top of the client's defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestOptions<'a> {
    /// URL query parameters
    pub params: Option<&'a [(&'a str, &'a str)]>,
    /// JSON body
    pub json: Option<&'a Value>,
    /// Form-encoded body (used by the token endpoint)
    pub form: Option<&'a [(&'a str, &'a str)]>,
    /// Extra headers merged over the session defaults
    pub headers: Option<&'a [(&'a str, &'a str)]>,
}

/// HTTP client over a persistent connection pool
pub struct ApiClient {
    http: Client,
    base_url: String,
    max_retries: u32,
    base_backoff: Duration,
    raise_on_error: bool,
    default_headers: Vec<(String, String)>,
    bearer: Mutex<Option<String>>,
    last_request: Mutex<Option<RequestRecord>>,
    last_response: Mutex<Option<ResponseRecord>>,
}

impl ApiClient {
    /// Start building a client for the given base URL.
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Build a client from loaded configuration. A pre-issued token in
    /// `auth.access_token` (the `ACCESS_TOKEN` variable) bypasses login.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::builder(config.base_url())
            .timeout(Duration::from_secs(config.timeout_secs()))
            .max_retries(config.max_retries())
            .build()?;
        if let Some(token) = config.get_str("auth.access_token").filter(|t| !t.is_empty()) {
            client.set_bearer(token);
        }
        Ok(client)
    }

    /// Build a client carrying the pre-issued admin token from
    /// `auth.admin_token` (the `ADMIN_TOKEN` variable), for admin-scoped
    /// endpoints. Errors when no admin token is configured.
    pub fn admin_from_config(config: &Config) -> Result<Self> {
        let token = config
            .get_nonempty("auth.admin_token")
            .ok_or_else(|| Error::Config("auth.admin_token is not configured".to_string()))?;
        let client = Self::builder(config.base_url())
            .timeout(Duration::from_secs(config.timeout_secs()))
            .max_retries(config.max_retries())
            .build()?;
        client.set_bearer(token);
        Ok(client)
    }

    /// Install (or replace) the bearer token attached to every request.
    pub fn set_bearer(&self, token: impl Into<String>) {
        if let Ok(mut bearer) = self.bearer.lock() {
            *bearer = Some(token.into());
        }
    }

    /// Drop the bearer token.
    pub fn clear_bearer(&self) {
        if let Ok(mut bearer) = self.bearer.lock() {
            *bearer = None;
        }
    }

    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        self.send(Method::GET, endpoint, RequestOptions::default()).await
    }

    pub async fn get_with_params(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        self.send(
            Method::GET,
            endpoint,
            RequestOptions { params: Some(params), ..Default::default() },
        )
        .await
    }

    pub async fn post(&self, endpoint: &str, json: &Value) -> Result<ApiResponse> {
        self.send(
            Method::POST,
            endpoint,
            RequestOptions { json: Some(json), ..Default::default() },
        )
        .await
    }

    /// POST a form-encoded body; used for OAuth token grants.
    pub async fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<ApiResponse> {
        self.send(
            Method::POST,
            endpoint,
            RequestOptions { form: Some(form), ..Default::default() },
        )
        .await
    }

    pub async fn put(&self, endpoint: &str, json: &Value) -> Result<ApiResponse> {
        self.send(
            Method::PUT,
            endpoint,
            RequestOptions { json: Some(json), ..Default::default() },
        )
        .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, endpoint, RequestOptions::default()).await
    }

    /// Issue a request with full per-call control.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        opts: RequestOptions<'_>,
    ) -> Result<ApiResponse> {
        let url = self.build_url(endpoint);
        self.record_request(&method, &url);
        debug!(%method, %url, body = ?opts.json, "sending request");

        let attempts = self.max_retries + 1;
        for attempt in 1..=attempts {
            let builder = self.prepare(method.clone(), &url, &opts);

            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if RETRY_STATUS_CODES.contains(&status) && attempt < attempts {
                        debug!(attempt, status, %url, "transient status, retrying");
                        self.sleep_with_backoff(attempt).await;
                        continue;
                    }

                    let body = resp.text().await.map_err(Error::Transport)?;
                    self.record_response(status, &body);
                    debug!(status, body = %truncate(&body, BODY_SNIPPET_LEN), "received response");

                    if self.raise_on_error && !(200..300).contains(&status) {
                        let snippet = truncate(&body, BODY_SNIPPET_LEN);
                        error!(status, %url, %snippet, "HTTP error response");
                        return Err(Error::HttpStatus { status, url, snippet });
                    }
                    return Ok(ApiResponse { status, url, body });
                }
                Err(e) => {
                    if attempt < attempts && (e.is_timeout() || e.is_connect() || e.is_request()) {
                        debug!(attempt, error = %e, %url, "transport error, retrying");
                        self.sleep_with_backoff(attempt).await;
                        continue;
                    }
                    error!(%url, error = %e, "request failed");
                    return Err(Error::Transport(e));
                }
            }
        }

        // attempts >= 1, so the loop always returns
        unreachable!("retry loop exited without a result")
    }

    /// POST and collect a chunked/streamed response body (chat endpoints
    /// stream tokens). Streaming requests are not retried: the body may be
    /// partially consumed by the time a failure shows up.
    pub async fn post_stream(&self, endpoint: &str, json: &Value) -> Result<ApiResponse> {
        let url = self.build_url(endpoint);
        self.record_request(&Method::POST, &url);
        debug!(%url, "sending streaming request");

        let opts = RequestOptions { json: Some(json), ..Default::default() };
        let resp = self.prepare(Method::POST, &url, &opts).send().await?;
        let status = resp.status().as_u16();

        let mut stream = resp.bytes_stream();
        let mut body = String::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(Error::Transport)?;
            body.push_str(&String::from_utf8_lossy(&bytes));
        }

        self.record_response(status, &body);
        if self.raise_on_error && !(200..300).contains(&status) {
            let snippet = truncate(&body, BODY_SNIPPET_LEN);
            return Err(Error::HttpStatus { status, url, snippet });
        }
        Ok(ApiResponse { status, url, body })
    }

    /// Method and URL of the most recent request, for post-hoc debugging.
    pub fn last_request(&self) -> Option<RequestRecord> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    /// Status and truncated body of the most recent response.
    pub fn last_response(&self) -> Option<ResponseRecord> {
        self.last_response.lock().ok().and_then(|r| r.clone())
    }

    /// Join the base URL and an endpoint with exactly one `/` between them.
    /// Absolute URLs pass through untouched (the token endpoint lives on a
    /// different host than the business API).
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn prepare(&self, method: Method, url: &str, opts: &RequestOptions<'_>) -> RequestBuilder {
        let mut builder = self.http.request(method, url);

        for (key, value) in &self.default_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Ok(bearer) = self.bearer.lock() {
            if let Some(token) = bearer.as_deref() {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(headers) = opts.headers {
            for (key, value) in headers {
                builder = builder.header(*key, *value);
            }
        }
        if let Some(params) = opts.params {
            builder = builder.query(params);
        }
        if let Some(json) = opts.json {
            builder = builder.json(json);
        }
        if let Some(form) = opts.form {
            builder = builder.form(form);
        }
        builder
    }

    fn record_request(&self, method: &Method, url: &str) {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(RequestRecord { method: method.to_string(), url: url.to_string() });
        }
    }

    fn record_response(&self, status: u16, body: &str) {
        if let Ok(mut last) = self.last_response.lock() {
            *last = Some(ResponseRecord { status, snippet: truncate(body, BODY_SNIPPET_LEN) });
        }
    }

    fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8);
        self.base_backoff.saturating_mul(1 << shift)
    }

    async fn sleep_with_backoff(&self, retry_number: u32) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`ApiClient`]
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    base_backoff: Duration,
    raise_on_error: bool,
    default_headers: Vec<(String, String)>,
}

impl ApiClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        ApiClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: Duration::from_millis(200),
            raise_on_error: true,
            default_headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry budget for transient failures; total attempts are retries + 1.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// When false, non-2xx responses are returned for inspection instead of
    /// becoming errors. Business tests asserting on 4xx paths want this off.
    pub fn raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    /// Add a header attached to every request.
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let http = Client::builder().timeout(self.timeout).build().map_err(Error::Transport)?;
        let mut default_headers = self.default_headers;
        // Session-wide origin/referer derived from the base URL, as the
        // browser client sends them. Explicit overrides win.
        if let Ok(url) = reqwest::Url::parse(&self.base_url) {
            let origin = url.origin().ascii_serialization();
            if !default_headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("origin")) {
                default_headers.push(("origin".to_string(), origin.clone()));
                default_headers.push(("referer".to_string(), format!("{origin}/")));
            }
        }
        debug!(
            base_url = %self.base_url,
            timeout_secs = self.timeout.as_secs(),
            max_retries = self.max_retries,
            "api client initialized"
        );
        Ok(ApiClient {
            http,
            base_url: self.base_url,
            max_retries: self.max_retries,
            base_backoff: self.base_backoff,
            raise_on_error: self.raise_on_error,
            default_headers,
            bearer: Mutex::new(None),
            last_request: Mutex::new(None),
            last_response: Mutex::new(None),
        })
    }
}

/// Truncate to at most `limit` characters without splitting a code point.
fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

//! HTTP request executor
//!
//! This module handles all HTTP requests for the crawler, including:
//! - A lazily built, reused connection pool
//! - Default headers merged with per-call headers and cookies
//! - Proxy configuration
//! - Retry with linear backoff over classified failures

use crate::config::ExecutorConfig;
use crate::{ConfigError, CrawlError, FetchError, FetchErrorKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, USER_AGENT};
use reqwest::{Client, Method, Proxy};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

/// How many attempts a request gets and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_retries: u32,

    /// Backoff unit
    pub delay: Duration,
}

impl RetryPolicy {
    /// Sleep inserted after the failed attempt with 0-based index `attempt_index`
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.delay * (attempt_index + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Per-call request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,

    /// Headers merged over the executor defaults for this call only
    pub headers: BTreeMap<String, String>,

    /// Cookies sent as a single `Cookie` header
    pub cookies: BTreeMap<String, String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    /// Options for a GET carrying extra headers
    pub fn with_headers(headers: BTreeMap<String, String>) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct ExecutorSettings {
    retry: RetryPolicy,
    proxy: Option<String>,
    timeout: Duration,
    default_headers: HeaderMap,
}

/// Issues HTTP requests with retry, proxy, header and cookie support
///
/// The executor is shared between crawl tasks (`Arc<RequestExecutor>`). Its
/// configuration can be changed at any time; changes only affect calls that
/// start afterwards.
#[derive(Debug)]
pub struct RequestExecutor {
    settings: RwLock<ExecutorSettings>,
    client: Mutex<Option<Client>>,
}

impl RequestExecutor {
    /// Creates an executor from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(RequestExecutor)` - Executor ready to use (the pool is built on first request)
    /// * `Err(CrawlError::Config)` - A default header or the proxy is invalid
    pub fn new(config: &ExecutorConfig) -> Result<Self, CrawlError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, config_header_value(&config.user_agent)?);
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigError::Validation(format!("Invalid header name '{}': {}", name, e))
            })?;
            default_headers.insert(name, config_header_value(value)?);
        }

        if let Some(proxy) = &config.proxy {
            check_proxy(proxy)?;
        }

        Ok(Self {
            settings: RwLock::new(ExecutorSettings {
                retry: RetryPolicy {
                    max_retries: config.max_retries.max(1),
                    delay: config.retry_delay(),
                },
                proxy: config.proxy.clone(),
                timeout: config.timeout(),
                default_headers,
            }),
            client: Mutex::new(None),
        })
    }

    /// Fetches a URL and returns the response body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | Non-2xx status | Retry after `delay * (attempt + 1)` |
    /// | Transport error | Retry after `delay * (attempt + 1)` |
    /// | Invalid request | Fail immediately |
    /// | Last attempt fails | Fail with `FetchError` |
    pub async fn make_request(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<String, FetchError> {
        let (policy, mut headers) = {
            let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            (settings.retry, settings.default_headers.clone())
        };

        let fail = |attempts: u32, kind: FetchErrorKind| FetchError {
            url: url.to_string(),
            attempts,
            kind,
        };

        merge_headers(&mut headers, options).map_err(|kind| fail(0, kind))?;
        let client = self.session().map_err(|kind| fail(0, kind))?;

        let mut attempt_index = 0;
        loop {
            tracing::trace!(
                "{} {} (attempt {}/{})",
                options.method,
                url,
                attempt_index + 1,
                policy.max_retries
            );

            let kind = match send_once(&client, &options.method, url, &headers).await {
                Ok(body) => return Ok(body),
                Err(kind) => kind,
            };

            let attempts = attempt_index + 1;
            if !kind.is_retryable() || attempts >= policy.max_retries {
                tracing::error!("Giving up on {} after {} attempt(s): {}", url, attempts, kind);
                return Err(fail(attempts, kind));
            }

            let backoff = policy.backoff(attempt_index);
            tracing::warn!(
                "Request to {} failed ({}), retrying in {:?}",
                url,
                kind,
                backoff
            );
            tokio::time::sleep(backoff).await;
            attempt_index += 1;
        }
    }

    /// Sets or clears the proxy used by subsequent requests
    ///
    /// The pooled client is dropped so the next request rebuilds it with the
    /// new proxy; requests already running keep their own client handle.
    pub fn set_proxy(&self, proxy: Option<&str>) -> Result<(), CrawlError> {
        if let Some(proxy) = proxy {
            check_proxy(proxy)?;
        }

        {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            settings.proxy = proxy.map(str::to_string);
        }
        self.reset_session();
        tracing::info!("Proxy set to {:?}", proxy);
        Ok(())
    }

    /// Replaces the retry policy for subsequent requests
    pub fn set_retry_policy(&self, max_retries: u32, delay: Duration) -> Result<(), CrawlError> {
        if max_retries < 1 {
            return Err(ConfigError::Validation(format!(
                "max_retries must be >= 1, got {}",
                max_retries
            ))
            .into());
        }

        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        settings.retry = RetryPolicy { max_retries, delay };
        Ok(())
    }

    /// Current retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .retry
    }

    /// Current proxy, if any
    pub fn proxy(&self) -> Option<String> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .proxy
            .clone()
    }

    /// Whether a connection pool is currently open
    pub fn is_open(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Releases the connection pool
    ///
    /// A later request lazily opens a new one.
    pub fn close(&self) {
        if self.reset_session() {
            tracing::debug!("Connection pool released");
        }
    }

    fn reset_session(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Returns the pooled client, building it on first use
    fn session(&self) -> Result<Client, FetchErrorKind> {
        let mut client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = client.as_ref() {
            return Ok(client.clone());
        }

        let settings = self
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let built = build_http_client(settings.timeout, settings.proxy.as_deref())
            .map_err(|e| FetchErrorKind::InvalidRequest(e.to_string()))?;
        tracing::debug!("Opened connection pool");
        *client = Some(built.clone());
        Ok(built)
    }
}

/// Builds an HTTP client with the crawler's transport settings
///
/// Headers are not baked into the client; they are merged per request so
/// that the defaults stay untouched by per-call overrides.
pub fn build_http_client(timeout: Duration, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

async fn send_once(
    client: &Client,
    method: &Method,
    url: &str,
    headers: &HeaderMap,
) -> Result<String, FetchErrorKind> {
    let response = client
        .request(method.clone(), url)
        .headers(headers.clone())
        .send()
        .await
        .map_err(classify_transport_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchErrorKind::Status(status.as_u16()));
    }

    response.text().await.map_err(classify_transport_error)
}

fn classify_transport_error(e: reqwest::Error) -> FetchErrorKind {
    if e.is_builder() {
        FetchErrorKind::InvalidRequest(e.to_string())
    } else if e.is_timeout() {
        FetchErrorKind::Transport("Request timeout".to_string())
    } else if e.is_connect() {
        FetchErrorKind::Transport("Connection refused".to_string())
    } else {
        FetchErrorKind::Transport(e.to_string())
    }
}

/// Applies per-call headers and cookies over a copy of the defaults
fn merge_headers(headers: &mut HeaderMap, options: &RequestOptions) -> Result<(), FetchErrorKind> {
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchErrorKind::InvalidRequest(format!("header '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchErrorKind::InvalidRequest(format!("header '{}': {}", name.as_str(), e)))?;
        headers.insert(name, value);
    }

    if !options.cookies.is_empty() {
        let cookie = options
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| FetchErrorKind::InvalidRequest(format!("cookie: {}", e)))?;
        headers.insert(COOKIE, value);
    }

    Ok(())
}

fn config_header_value(value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|e| ConfigError::Validation(format!("Invalid header value '{}': {}", value, e)))
}

fn check_proxy(proxy: &str) -> Result<(), ConfigError> {
    Proxy::all(proxy)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))
}

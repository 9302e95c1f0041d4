use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Browser-like user agent sent when the config does not override it
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Per-domain request rates; domains not listed are unlimited
    #[serde(default, rename = "rate-limit")]
    pub rate_limits: Vec<RateLimitEntry>,

    /// Keyword categories used to file crawl records
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

/// Request executor behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Total attempts per request, including the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff unit; attempt `n` (0-based) waits `delay * (n + 1)`
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Overall per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Optional proxy URL applied to every request
    #[serde(default)]
    pub proxy: Option<String>,

    /// Extra headers merged into every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ExecutorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            proxy: None,
            headers: BTreeMap::new(),
        }
    }
}

/// Scheduler behavior
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between checks for due scheduled tasks (milliseconds)
    #[serde(rename = "tick-ms", default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

/// Defaults for paginated crawls
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Query parameter carrying the page index
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_param: default_page_param(),
            start_page: default_start_page(),
            max_pages: default_max_pages(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Rate limit for a single domain
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitEntry {
    /// Exact host name, compared case-insensitively
    pub domain: String,

    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,
}

/// Classification category with its keywords
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub name: String,

    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_max_pages() -> u32 {
    1
}

fn default_database_path() -> String {
    "./cadence.db".to_string()
}

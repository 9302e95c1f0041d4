//! Cadence: a polite page fetcher and content-pattern analyzer
//!
//! This crate fetches web pages under per-domain rate limits, retries
//! transient failures with linear backoff, drives paginated fan-out crawls,
//! and scores DOM regions of the fetched HTML by likely importance.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod crawler;
pub mod monitor;
pub mod queue;
pub mod state;
pub mod storage;
pub mod url;

use std::fmt;
use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid URL: {url}")]
    Validation { url: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Short, stable name of the error kind (used for monitoring)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Fetch(_) => "fetch",
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
            Self::Scheduler(_) => "scheduler",
            Self::Cancelled => "cancelled",
            Self::UrlParse(_) => "url_parse",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// A request that failed after the retry policy was exhausted
#[derive(Debug, Error)]
#[error("Failed to fetch {url} after {attempts} attempt(s): {kind}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub kind: FetchErrorKind,
}

/// Classification of a single failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The server answered with a non-success status
    Status(u16),

    /// Connection, timeout, TLS or body read failure
    Transport(String),

    /// The request could not be built (bad header, bad proxy, bad URL)
    InvalidRequest(String),
}

impl FetchErrorKind {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::Transport(message) => write!(f, "transport error: {}", message),
            Self::InvalidRequest(message) => write!(f, "invalid request: {}", message),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use analysis::{ContentAnalyzer, ContentPattern, ContentType, CrawlSuggestions};
pub use config::Config;
pub use crawler::{PageResult, RateLimiter, RequestExecutor, Spider};
pub use queue::{TaskQueue, TaskScheduler};
pub use state::{Task, TaskId};
pub use url::{extract_domain, validate_url};

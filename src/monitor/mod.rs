//! Observability hooks for the crawl pipeline
//!
//! The core reports to a `Monitor` but never depends on what it does with
//! the reports: both hooks are fire-and-forget.

mod stats;

pub use stats::{print_snapshot, MonitorSnapshot, TracingMonitor};

use crate::CrawlError;
use std::time::Duration;

/// Measurements for one successful page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlMetrics {
    pub url: String,

    /// Time spent waiting on the rate limiter plus the request itself
    pub duration: Duration,

    /// Size of the response body
    pub bytes: usize,

    /// Links kept by the page parser
    pub links: usize,
}

/// Receiver of crawl metrics and errors
pub trait Monitor: Send + Sync {
    /// Records metrics for a fetched page
    fn record_metrics(&self, metrics: &CrawlMetrics);

    /// Records an error together with a short description of where it happened
    fn handle_error(&self, error: &CrawlError, context: &str);
}

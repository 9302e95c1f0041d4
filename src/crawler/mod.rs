//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP requests with retry and linear backoff
//! - Per-domain rate limiting
//! - HTML parsing for metadata, links and visible text
//! - Single-page and paginated crawls
//! - The end-to-end task pipeline

mod coordinator;
mod executor;
mod parser;
mod rate_limiter;
mod spider;

pub use coordinator::Coordinator;
pub use executor::{build_http_client, RequestExecutor, RequestOptions, RetryPolicy};
pub use parser::{extract_link_urls, extract_text, parse_page, Link, PageMetadata, MAX_LINKS};
pub use rate_limiter::RateLimiter;
pub use spider::{PageResult, PaginationRun, PaginationStop, Spider};

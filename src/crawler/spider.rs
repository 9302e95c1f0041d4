//! Page fetching and pagination fan-out
//!
//! The spider composes the rate limiter and the request executor: every fetch
//! first claims the domain's rate slot, then goes through the executor's
//! retry loop, and the body is parsed for lightweight metadata.

use crate::config::Config;
use crate::crawler::executor::{RequestExecutor, RequestOptions};
use crate::crawler::parser::{parse_page, PageMetadata};
use crate::crawler::rate_limiter::RateLimiter;
use crate::monitor::{CrawlMetrics, Monitor};
use crate::url::{extract_domain, page_url};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub html: String,

    /// When the response body was received
    pub timestamp: DateTime<Utc>,

    pub metadata: PageMetadata,
}

/// Why a pagination run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationStop {
    /// Every page index in the range was visited
    Exhausted,

    /// A listing page came back with an empty body
    EmptyPage { page: u32 },

    /// The link parser found no child URLs on a listing page
    NoChildLinks { page: u32 },

    /// A listing page could not be fetched
    PageFailed { page: u32, error: String },

    /// The cancellation token fired between fetches
    Cancelled,
}

/// Outcome of `Spider::crawl_with_pagination`
#[derive(Debug, Clone)]
pub struct PaginationRun {
    /// Child pages fetched successfully, in crawl order
    pub results: Vec<PageResult>,

    /// Listing pages fetched, including the one that stopped the run
    pub pages_visited: u32,

    pub stop: PaginationStop,
}

/// Fetches pages politely and drives paginated crawls
pub struct Spider {
    executor: Arc<RequestExecutor>,
    rate_limiter: Arc<RateLimiter>,
    monitor: Option<Arc<dyn Monitor>>,
}

impl Spider {
    pub fn new(executor: Arc<RequestExecutor>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            executor,
            rate_limiter,
            monitor: None,
        }
    }

    /// Builds an executor and a rate limiter from configuration
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let executor = RequestExecutor::new(&config.executor)?;
        let rate_limiter = RateLimiter::with_rates(
            config
                .rate_limits
                .iter()
                .map(|entry| (entry.domain.as_str(), entry.requests_per_second)),
        );

        Ok(Self::new(Arc::new(executor), Arc::new(rate_limiter)))
    }

    /// Attaches a monitor that receives fetch metrics and skipped failures
    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Whether `url` is an http(s) URL with a well-formed host
    pub fn validate_url(url: &str) -> bool {
        crate::url::validate_url(url)
    }

    /// Fetches a single page
    ///
    /// # Arguments
    ///
    /// * `url` - The page to fetch
    /// * `headers` - Extra headers for this request only
    ///
    /// # Returns
    ///
    /// * `Ok(PageResult)` - Body plus title, meta tags and the first 100 links
    /// * `Err(CrawlError::Validation)` - Rejected before any network call
    /// * `Err(CrawlError::Fetch)` - Every attempt failed
    pub async fn crawl(
        &self,
        url: &str,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<PageResult, CrawlError> {
        if !Self::validate_url(url) {
            tracing::warn!("Rejecting invalid URL: {}", url);
            return Err(CrawlError::Validation {
                url: url.to_string(),
            });
        }

        let parsed = Url::parse(url)?;
        let started = Instant::now();

        if let Some(domain) = extract_domain(&parsed) {
            self.rate_limiter.acquire(&domain).await;
        }

        let options = headers
            .cloned()
            .map(RequestOptions::with_headers)
            .unwrap_or_default();
        let html = self.executor.make_request(url, &options).await?;
        let timestamp = Utc::now();

        let metadata = parse_page(&html, Some(&parsed));
        tracing::info!("Crawled {} ({} links)", url, metadata.links.len());

        if let Some(monitor) = &self.monitor {
            monitor.record_metrics(&CrawlMetrics {
                url: url.to_string(),
                duration: started.elapsed(),
                bytes: html.len(),
                links: metadata.links.len(),
            });
        }

        Ok(PageResult {
            url: url.to_string(),
            html,
            timestamp,
            metadata,
        })
    }

    /// Walks a paginated listing and crawls the children of every page
    ///
    /// Page indices run over `start_page..start_page + max_pages`. For each
    /// index the listing page is fetched, `page_link_parser` turns its HTML
    /// into child URLs, and each child is crawled in order.
    ///
    /// # Stopping
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Listing page body is empty | Stop, keep results |
    /// | Parser returns no URLs | Stop, keep results |
    /// | Listing page fetch fails | Stop, keep results |
    /// | Child fetch fails | Log, report, skip the child |
    /// | Token cancelled | Stop before the next fetch |
    pub async fn crawl_with_pagination<F>(
        &self,
        base_url: &str,
        page_link_parser: F,
        start_page: u32,
        max_pages: u32,
        page_param: &str,
        cancel: &CancellationToken,
    ) -> PaginationRun
    where
        F: Fn(&str) -> Vec<String>,
    {
        let mut results = Vec::new();
        let mut pages_visited = 0;

        let stop = 'pages: {
            for page in start_page..start_page.saturating_add(max_pages) {
                if cancel.is_cancelled() {
                    break 'pages PaginationStop::Cancelled;
                }

                let listing_url = page_url(base_url, page_param, page);
                tracing::debug!("Fetching listing page {}: {}", page, listing_url);

                let listing = match self.crawl(&listing_url, None).await {
                    Ok(listing) => listing,
                    Err(e) => {
                        tracing::error!("Listing page {} failed, stopping: {}", page, e);
                        self.report(&e, &listing_url);
                        break 'pages PaginationStop::PageFailed {
                            page,
                            error: e.to_string(),
                        };
                    }
                };
                pages_visited += 1;

                if listing.html.trim().is_empty() {
                    tracing::info!("Listing page {} is empty, stopping", page);
                    break 'pages PaginationStop::EmptyPage { page };
                }

                let children = page_link_parser(&listing.html);
                if children.is_empty() {
                    tracing::info!("No child links on page {}, stopping", page);
                    break 'pages PaginationStop::NoChildLinks { page };
                }

                tracing::debug!("Page {} yielded {} child links", page, children.len());
                for child in children {
                    if cancel.is_cancelled() {
                        break 'pages PaginationStop::Cancelled;
                    }

                    match self.crawl(&child, None).await {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            tracing::warn!("Skipping child {}: {}", child, e);
                            self.report(&e, &child);
                        }
                    }
                }
            }

            PaginationStop::Exhausted
        };

        tracing::info!(
            "Pagination of {} finished after {} page(s), {} result(s): {:?}",
            base_url,
            pages_visited,
            results.len(),
            stop
        );

        PaginationRun {
            results,
            pages_visited,
            stop,
        }
    }

    fn report(&self, error: &CrawlError, url: &str) {
        if let Some(monitor) = &self.monitor {
            monitor.handle_error(error, &format!("crawl {}", url));
        }
    }
}

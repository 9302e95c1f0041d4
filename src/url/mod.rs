//! URL handling module
//!
//! This module provides crawlable-URL validation, domain extraction for rate
//! limiting, and pagination URL construction.

mod domain;

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub use domain::{domain_of, extract_domain};

/// http(s) scheme, a host (domain with TLD, localhost, or dotted IPv4),
/// optional port, optional path/query without whitespace.
const CRAWLABLE_URL_PATTERN: &str = r"(?i)^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$";

fn crawlable_url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(CRAWLABLE_URL_PATTERN).expect("static URL pattern compiles"))
}

/// Checks whether a URL is something the spider is willing to fetch
///
/// # Examples
///
/// ```
/// use cadence_crawler::url::validate_url;
///
/// assert!(validate_url("http://example.com"));
/// assert!(validate_url("https://sub.example.com/path?q=1"));
/// assert!(validate_url("http://localhost:8080/feed"));
/// assert!(!validate_url("ftp://example.com"));
/// assert!(!validate_url("not_a_url"));
/// assert!(!validate_url(""));
/// assert!(!validate_url("http://example.com:99999/"));
/// ```
pub fn validate_url(url: &str) -> bool {
    // The pattern does not bound ports or IPv4 octets
    crawlable_url_regex().is_match(url) && Url::parse(url).is_ok()
}

/// Builds the URL of one page in a paginated listing
///
/// The page parameter is appended with `&` when the base already carries a
/// query string and with `?` otherwise.
///
/// # Examples
///
/// ```
/// use cadence_crawler::url::page_url;
///
/// assert_eq!(page_url("https://example.com/list", "page", 2), "https://example.com/list?page=2");
/// assert_eq!(page_url("https://example.com/list?sort=new", "p", 3), "https://example.com/list?sort=new&p=3");
/// ```
pub fn page_url(base_url: &str, page_param: &str, index: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base_url, separator, page_param, index)
}

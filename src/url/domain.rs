use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// The port is not part of the domain, so every port of a host shares one rate limit.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use cadence_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses a URL string and extracts its domain
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(extract_domain)
}

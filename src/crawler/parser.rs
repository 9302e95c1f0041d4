//! HTML parser for lightweight page metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Named meta tags
//! - Anchor links with their text (first 100 only)
//! - Visible body text for classification
//!
//! Parsing never fails: malformed markup yields whatever could be recovered.

use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Maximum number of links kept per page
pub const MAX_LINKS: usize = 100;

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Absolute URL when the href could be resolved, the raw href otherwise
    pub url: String,

    /// Trimmed anchor text
    pub text: String,
}

/// Metadata extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// The page title (from the first <title> tag)
    pub title: Option<String>,

    /// `<meta name=".." content="..">` pairs; later duplicates win
    pub meta_tags: BTreeMap<String, String>,

    /// Links in document order, truncated to `MAX_LINKS`
    pub links: Vec<Link>,
}

/// Parses HTML content and extracts title, meta tags and links
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page URL, used to resolve relative links
///
/// # Example
///
/// ```
/// use cadence_crawler::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, Some(&base_url));
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url, "https://example.com/page");
/// ```
pub fn parse_page(html: &str, base_url: Option<&Url>) -> PageMetadata {
    let document = Html::parse_document(html);

    PageMetadata {
        title: extract_title(&document),
        meta_tags: extract_meta_tags(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts named meta tags with non-empty content
fn extract_meta_tags(document: &Html) -> BTreeMap<String, String> {
    let mut meta_tags = BTreeMap::new();

    if let Ok(meta_selector) = Selector::parse("meta[name][content]") {
        for element in document.select(&meta_selector) {
            let name = element.value().attr("name").unwrap_or_default();
            let content = element.value().attr("content").unwrap_or_default();
            if !name.is_empty() && !content.is_empty() {
                meta_tags.insert(name.to_string(), content.to_string());
            }
        }
    }

    meta_tags
}

/// Extracts the first `MAX_LINKS` anchors with an href
fn extract_links(document: &Html, base_url: Option<&Url>) -> Vec<Link> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            Some(Link {
                url: resolve_link(href, base_url),
                text: element.text().collect::<String>().trim().to_string(),
            })
        })
        .take(MAX_LINKS)
        .collect()
}

/// Resolves a link href against the page URL
///
/// Hrefs that cannot be joined (or pages without a parsable URL) are kept verbatim.
fn resolve_link(href: &str, base_url: Option<&Url>) -> String {
    let href = href.trim();
    base_url
        .and_then(|base| base.join(href).ok())
        .map(|absolute| absolute.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Convenience function for extracting just the link URLs from HTML
pub fn extract_link_urls(html: &str, base_url: Option<&Url>) -> Vec<String> {
    parse_page(html, base_url)
        .links
        .into_iter()
        .map(|link| link.url)
        .collect()
}

/// Elements whose text is never rendered
const INVISIBLE_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Extracts the visible text of a page, whitespace collapsed to single spaces
///
/// ```
/// use cadence_crawler::crawler::extract_text;
///
/// let html = "<html><head><title>T</title></head><body><p>Hello\n  <b>world</b></p><script>x()</script></body></html>";
/// assert_eq!(extract_text(html), "Hello world");
/// ```
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| INVISIBLE_TAGS.contains(&element.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        let parsed = parse_page(html, Some(&base_url()));
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_page(html, Some(&base_url()));
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_meta_tags() {
        let html = r#"
            <html><head>
                <meta name="description" content="Test description">
                <meta name="keywords" content="a, b">
                <meta name="empty" content="">
                <meta property="og:title" content="ignored">
                <meta charset="utf-8">
                <meta name="description" content="Second description">
            </head></html>
        "#;
        let parsed = parse_page(html, Some(&base_url()));

        assert_eq!(parsed.meta_tags.len(), 2);
        assert_eq!(
            parsed.meta_tags.get("description").map(String::as_str),
            Some("Second description")
        );
        assert_eq!(parsed.meta_tags.get("keywords").map(String::as_str), Some("a, b"));
    }

    #[test]
    fn test_extract_links_with_text() {
        let html = r#"
            <html><body>
                <a href="http://example.com/link1"> Link 1 </a>
                <a href="/link2">Link <b>2</b></a>
                <a name="anchor-without-href">Nope</a>
            </body></html>
        "#;
        let parsed = parse_page(html, Some(&base_url()));

        assert_eq!(parsed.links.len(), 2);
        assert_eq!(
            parsed.links[0],
            Link {
                url: "http://example.com/link1".to_string(),
                text: "Link 1".to_string(),
            }
        );
        assert_eq!(parsed.links[1].url, "https://example.com/link2");
        assert_eq!(parsed.links[1].text, "Link 2");
    }

    #[test]
    fn test_links_kept_verbatim_without_base() {
        let html = r#"<a href="/relative">x</a><a href="javascript:void(0)">y</a>"#;
        let parsed = parse_page(html, None);

        assert_eq!(parsed.links[0].url, "/relative");
        assert_eq!(parsed.links[1].url, "javascript:void(0)");
    }

    #[test]
    fn test_links_truncated_to_limit() {
        let html: String = (0..150)
            .map(|i| format!(r#"<a href="/item/{}">Item {}</a>"#, i, i))
            .collect();
        let parsed = parse_page(&html, Some(&base_url()));

        assert_eq!(parsed.links.len(), MAX_LINKS);
        assert_eq!(parsed.links[99].url, "https://example.com/item/99");
    }

    #[test]
    fn test_malformed_html_is_recovered() {
        let html = r#"<html><body><div><p>Unclosed <a href="/x">x</div><span>"#;
        let parsed = parse_page(html, Some(&base_url()));
        assert_eq!(parsed.links.len(), 1);
    }

    #[test]
    fn test_extract_text_skips_invisible_elements() {
        let html = r#"
            <html>
                <head><title>Title</title><style>p { color: red }</style></head>
                <body>
                    <h1>Heading</h1>
                    <p>First   paragraph</p>
                    <script>var hidden = 1;</script>
                    <noscript>Enable JS</noscript>
                    <p>Second</p>
                </body>
            </html>
        "#;
        assert_eq!(extract_text(html), "Heading First paragraph Second");
    }

    #[test]
    fn test_extract_text_of_empty_document() {
        assert_eq!(extract_text(""), "");
    }

    #[test]
    fn test_extract_link_urls() {
        let html = r#"<a href="/a">a</a><a href="https://other.com/b">b</a>"#;
        assert_eq!(
            extract_link_urls(html, Some(&base_url())),
            vec!["https://example.com/a", "https://other.com/b"]
        );
    }
}

use cadence_crawler::config::ExecutorConfig;
use cadence_crawler::crawler::{PaginationStop, RateLimiter, RequestExecutor, Spider};
use cadence_crawler::monitor::TracingMonitor;
use cadence_crawler::CrawlError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn spider_with_rates(rates: &[(&str, f64)]) -> Spider {
    let executor = RequestExecutor::new(&ExecutorConfig {
        max_retries: 1,
        retry_delay_ms: 10,
        timeout_secs: 5,
        ..ExecutorConfig::default()
    })
    .expect("Failed to create executor");

    Spider::new(
        Arc::new(executor),
        Arc::new(RateLimiter::with_rates(rates.iter().copied())),
    )
}

fn spider() -> Spider {
    spider_with_rates(&[])
}

/// Parser that reads child links from `<a class="item">` elements
fn item_links(html: &str) -> Vec<String> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("a.item").unwrap();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, page: u32, children: &[&str]) {
    let links: String = children
        .iter()
        .map(|child| format!(r#"<a class="item" href="{}{}">x</a>"#, server.uri(), child))
        .collect();

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body>{}</body></html>", links)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_extracts_metadata() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/article",
        r#"<html><head><title>Headline</title><meta name="author" content="Ada"></head>
        <body><a href="/next">Next</a></body></html>"#
            .to_string(),
    )
    .await;

    let url = format!("{}/article", mock_server.uri());
    let result = spider().crawl(&url, None).await.expect("Crawl failed");

    assert_eq!(result.url, url);
    assert_eq!(result.metadata.title.as_deref(), Some("Headline"));
    assert_eq!(
        result.metadata.meta_tags.get("author").map(String::as_str),
        Some("Ada")
    );
    assert_eq!(result.metadata.links.len(), 1);
    assert_eq!(
        result.metadata.links[0].url,
        format!("{}/next", mock_server.uri())
    );
}

#[tokio::test]
async fn test_crawl_sends_extra_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("referer", "https://example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let headers = BTreeMap::from([("Referer".to_string(), "https://example.com/".to_string())]);
    spider()
        .crawl(&mock_server.uri(), Some(&headers))
        .await
        .expect("Crawl with headers failed");
}

#[tokio::test]
async fn test_invalid_url_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = spider().crawl("not_a_url", None).await;
    assert!(matches!(result, Err(CrawlError::Validation { .. })));
}

#[tokio::test]
async fn test_fetch_failure_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let result = spider().crawl(&mock_server.uri(), None).await;
    match result {
        Err(CrawlError::Fetch(error)) => assert_eq!(error.attempts, 1),
        other => panic!("Expected a fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_spaces_requests_to_same_host() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/a", "<p>a</p>".to_string()).await;

    let spider = spider_with_rates(&[("127.0.0.1", 5.0)]);
    let url = format!("{}/a", mock_server.uri());

    let start = Instant::now();
    for _ in 0..3 {
        spider.crawl(&url, None).await.expect("Crawl failed");
    }

    // Three requests at 5/s need at least two 200ms gaps
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_pagination_stops_when_parser_finds_nothing() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 1, &["/item/1", "/item/2"]).await;
    mount_listing(&mock_server, 2, &[]).await;
    mount_page(&mock_server, "/item/1", "<title>One</title>".to_string()).await;
    mount_page(&mock_server, "/item/2", "<title>Two</title>".to_string()).await;

    // Page 3 must never be requested
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let run = spider()
        .crawl_with_pagination(
            &format!("{}/list", mock_server.uri()),
            item_links,
            1,
            5,
            "page",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(run.stop, PaginationStop::NoChildLinks { page: 2 });
    assert_eq!(run.pages_visited, 2);
    let titles: Vec<_> = run
        .results
        .iter()
        .map(|page| page.metadata.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["One", "Two"]);
}

#[tokio::test]
async fn test_pagination_skips_failed_children() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 1, &["/item/ok", "/item/missing", "/item/also-ok"]).await;
    mount_page(&mock_server, "/item/ok", "<title>Ok</title>".to_string()).await;
    mount_page(&mock_server, "/item/also-ok", "<title>Also</title>".to_string()).await;

    Mock::given(method("GET"))
        .and(path("/item/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let monitor = Arc::new(TracingMonitor::new());
    let spider = spider().with_monitor(monitor.clone());

    let run = spider
        .crawl_with_pagination(
            &format!("{}/list", mock_server.uri()),
            item_links,
            1,
            1,
            "page",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(run.stop, PaginationStop::Exhausted);
    assert_eq!(run.results.len(), 2);

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.errors_by_kind.get("fetch"), Some(&1));
    // One listing page plus two children
    assert_eq!(snapshot.pages_fetched, 3);
}

#[tokio::test]
async fn test_pagination_aborts_on_listing_failure() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 1, &["/item/1"]).await;
    mount_page(&mock_server, "/item/1", "<title>One</title>".to_string()).await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let run = spider()
        .crawl_with_pagination(
            &format!("{}/list", mock_server.uri()),
            item_links,
            1,
            5,
            "page",
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(run.stop, PaginationStop::PageFailed { page: 2, .. }));
    assert_eq!(run.pages_visited, 1);
    assert_eq!(run.results.len(), 1);
}

#[tokio::test]
async fn test_pagination_stops_on_empty_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&mock_server)
        .await;

    let run = spider()
        .crawl_with_pagination(
            &format!("{}/list?sort=new", mock_server.uri()),
            item_links,
            3,
            2,
            "p",
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(run.stop, PaginationStop::EmptyPage { page: 3 });
    assert!(run.results.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), Some("sort=new&p=3"));
}

use cadence_crawler::config::ExecutorConfig;
use cadence_crawler::crawler::{RequestExecutor, RequestOptions};
use cadence_crawler::FetchErrorKind;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(max_retries: u32, retry_delay_ms: u64) -> RequestExecutor {
    RequestExecutor::new(&ExecutorConfig {
        max_retries,
        retry_delay_ms,
        timeout_secs: 5,
        ..ExecutorConfig::default()
    })
    .expect("Failed to create executor")
}

#[tokio::test]
async fn test_success_after_transient_failures() {
    let mock_server = MockServer::start().await;

    // First two attempts fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = executor(3, 10)
        .make_request(
            &format!("{}/flaky", mock_server.uri()),
            &RequestOptions::default(),
        )
        .await
        .expect("Request should succeed on the third attempt");

    assert_eq!(body, "finally");
}

#[tokio::test]
async fn test_exhausted_retries_fail_after_linear_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let url = format!("{}/down", mock_server.uri());
    let start = Instant::now();
    let error = executor(3, 50)
        .make_request(&url, &RequestOptions::default())
        .await
        .expect_err("Every attempt fails");

    // 50ms after the first attempt, 100ms after the second, none after the last
    assert!(start.elapsed() >= Duration::from_millis(150));
    assert_eq!(error.url, url);
    assert_eq!(error.attempts, 3);
    assert_eq!(error.kind, FetchErrorKind::Status(503));
}

#[tokio::test]
async fn test_single_attempt_policy_does_not_sleep() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = executor(1, 5_000)
        .make_request(&mock_server.uri(), &RequestOptions::default())
        .await
        .expect_err("404 is not a success");

    assert_eq!(error.attempts, 1);
    assert_eq!(error.kind, FetchErrorKind::Status(404));
}

#[tokio::test]
async fn test_headers_and_cookies_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("x-api-key", "secret"))
        .and(header("cookie", "lang=en; session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut options = RequestOptions::default();
    options
        .headers
        .insert("X-Api-Key".to_string(), "secret".to_string());
    options
        .cookies
        .insert("session".to_string(), "abc".to_string());
    options.cookies.insert("lang".to_string(), "en".to_string());

    let body = executor(1, 10)
        .make_request(&format!("{}/private", mock_server.uri()), &options)
        .await
        .expect("Request with headers should succeed");

    assert_eq!(body, "welcome");
}

#[tokio::test]
async fn test_default_headers_include_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", "cadence-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = RequestExecutor::new(&ExecutorConfig {
        max_retries: 1,
        user_agent: "cadence-test/1.0".to_string(),
        ..ExecutorConfig::default()
    })
    .unwrap();

    let body = executor
        .make_request(&mock_server.uri(), &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_invalid_request_is_not_retried() {
    let start = Instant::now();
    let error = executor(3, 1_000)
        .make_request("not a url", &RequestOptions::default())
        .await
        .expect_err("Unparsable URL cannot be requested");

    assert_eq!(error.attempts, 1);
    assert!(matches!(error.kind, FetchErrorKind::InvalidRequest(_)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_pool_recreated_after_close() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let executor = executor(1, 10);
    executor
        .make_request(&mock_server.uri(), &RequestOptions::default())
        .await
        .unwrap();
    assert!(executor.is_open());

    executor.close();
    assert!(!executor.is_open());

    executor
        .make_request(&mock_server.uri(), &RequestOptions::default())
        .await
        .unwrap();
    assert!(executor.is_open());
}

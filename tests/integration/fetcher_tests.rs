use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yoink::config::CrawlerConfig;
use yoink::crawler::{FetchError, Fetcher, HttpFetcher};

fn fetcher(max_retries: u32) -> HttpFetcher {
    let config = CrawlerConfig {
        max_retries,
        timeout_secs: 5,
        user_agent: "yoink-test/1.0".to_string(),
        ..CrawlerConfig::default()
    };
    HttpFetcher::new(&config)
        .unwrap()
        .with_backoff(Duration::from_millis(5))
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><title>ok</title></html>", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/flaky", mock_server.uri());
    let response = fetcher(3).fetch(&url).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.body.contains("ok"));
    assert!(response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("text/html")));
}

#[tokio::test]
async fn test_client_errors_fail_immediately() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let err = fetcher(3).fetch(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status_code: 404, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let url = format!("{}/down", mock_server.uri());
    let err = fetcher(2).fetch(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status_code: 500, .. }));
}

#[tokio::test]
async fn test_sends_configured_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("user-agent", "yoink-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hi"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/ua", mock_server.uri());
    let response = fetcher(1).fetch(&url).await.unwrap();
    assert_eq!(response.body, "hi");
}

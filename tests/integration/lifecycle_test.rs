//! Integration tests for when and how often records are emitted.

mod helpers;

use axum::body::Body;
use http::Request;
use http_body_util::BodyExt;
use tokio::task::JoinSet;
use tower::ServiceExt;

use apilog_core::types::LogStream;

use helpers::TestApp;

#[tokio::test]
async fn test_record_written_after_body_is_read() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    // Nothing is written while the body is still pending.
    assert!(app.sink.is_empty());

    response.into_body().collect().await.unwrap();
    assert_eq!(app.sink.len(), 1);
}

#[tokio::test]
async fn test_dropped_response_is_logged_once() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/items/1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    drop(response);

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stdout);
    assert_eq!(record["statusCode"], 200);
    // The client never read the body, so nothing was captured.
    assert!(record.get("responseBody").is_none());
    assert_eq!(record["responseSize"], 0);
}

#[tokio::test]
async fn test_repeated_requests_produce_one_record_each() {
    let app = TestApp::new();

    for _ in 0..3 {
        app.request("GET", "/health", None, &[]).await;
    }

    let records = app.records(3).await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|(_, r)| r["url"] == "/health"));
}

#[tokio::test]
async fn test_concurrent_requests_are_logged_independently() {
    let app = TestApp::new();
    let mut tasks = JoinSet::new();

    for i in 0..20 {
        let router = app.router.clone();
        tasks.spawn(async move {
            let path = if i % 2 == 0 {
                format!("/health?n={i}")
            } else {
                format!("/items/{i}")
            };
            let request = Request::builder().uri(path).body(Body::empty()).unwrap();
            let response = router.oneshot(request).await.unwrap();
            response.into_body().collect().await.unwrap();
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let records = app.records(20).await;
    assert_eq!(records.len(), 20);

    let stdout = records
        .iter()
        .filter(|(stream, _)| *stream == LogStream::Stdout)
        .count();
    // Only /items/1 exists among the odd requests.
    assert_eq!(stdout, 11);
    assert_eq!(app.sink.lines(LogStream::Stderr).len(), 9);

    let mut urls: Vec<String> = records
        .iter()
        .map(|(_, r)| r["url"].as_str().unwrap().to_string())
        .collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 20);
}

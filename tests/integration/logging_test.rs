//! Integration tests for record contents and stream routing.

mod helpers;

use axum::Router;
use http::StatusCode;
use serde_json::json;

use apilog_api::{ApiLoggerLayer, build_router};
use apilog_core::config::LoggerConfig;
use apilog_core::formatter::hostname;
use apilog_core::sink::MemorySink;
use apilog_core::types::LogStream;

use helpers::{TestApp, compact_config};

#[tokio::test]
async fn test_successful_request_goes_to_stdout() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"status": "ok"}));

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stdout);
    assert_eq!(record["method"], "GET");
    assert_eq!(record["url"], "/health");
    assert_eq!(record["statusCode"], 200);
    assert_eq!(record["requestSize"], 2);
    assert_eq!(record["responseBody"], "{\"status\":\"ok\"}");
    assert_eq!(record["responseSize"], 15);
    assert_eq!(record["responseContentType"], "application/json");
    assert_eq!(record["httpVersion"], "1.1");
    assert_eq!(record["hostname"], hostname());
    assert_eq!(record["queryParams"], json!({}));
    assert!(record["timeTaken"].as_f64().unwrap() >= 0.0);
    assert!(record["timestamp"]["request"].is_string());
    assert!(record["timestamp"]["response"].is_string());
    assert!(record.get("body").is_none());
    assert!(record.get("error").is_none());
    assert!(record.get("ipInfo").is_none());
}

#[tokio::test]
async fn test_json_body_and_query_are_recorded() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/echo?source=test&tag=a&tag=b",
            Some(r#"{"name":"test","age":30}"#),
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"name": "test", "age": 30}));

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stdout);
    assert_eq!(record["url"], "/echo?source=test&tag=a&tag=b");
    assert_eq!(record["body"], json!({"name": "test", "age": 30}));
    assert_eq!(record["requestSize"], 24);
    assert_eq!(record["requestContentType"], "application/json");
    assert_eq!(
        record["queryParams"],
        json!({"source": "test", "tag": ["a", "b"]})
    );
    assert_eq!(record["responseSize"], response.raw.len());
}

#[tokio::test]
async fn test_excluded_headers_are_dropped_case_insensitively() {
    let app = TestApp::with_config(LoggerConfig {
        excluded_headers: vec!["Authorization".to_string(), "X-API-KEY".to_string()],
        ..compact_config()
    });

    app.request(
        "GET",
        "/health",
        None,
        &[
            ("authorization", "Bearer secret"),
            ("X-Api-Key", "k-123"),
            ("x-trace", "abc"),
            ("user-agent", "integration-test"),
            ("referer", "https://example.test/"),
        ],
    )
    .await;

    let (_, record) = app.only_record().await;
    let headers = record["headers"].as_object().unwrap();
    assert!(!headers.contains_key("authorization"));
    assert!(!headers.contains_key("x-api-key"));
    assert_eq!(headers["x-trace"], "abc");
    assert_eq!(record["userAgent"], "integration-test");
    assert_eq!(record["referer"], "https://example.test/");
}

#[tokio::test]
async fn test_disabled_flags_omit_bodies_and_query() {
    let app = TestApp::with_config(LoggerConfig {
        log_body: false,
        log_response: false,
        log_query_params: false,
        ..compact_config()
    });

    app.request(
        "POST",
        "/echo?secret=1",
        Some(r#"{"card":"4111"}"#),
        &[("content-type", "application/json")],
    )
    .await;

    let (_, record) = app.only_record().await;
    assert!(record.get("body").is_none());
    assert!(record.get("responseBody").is_none());
    assert_eq!(record["queryParams"], json!({}));
    // Sizes are measured regardless of the flags.
    assert_eq!(record["requestSize"], 15);
    assert_eq!(record["responseSize"], 15);
}

#[tokio::test]
async fn test_captured_not_found_goes_to_stderr() {
    let app = TestApp::new();

    let response = app.request("GET", "/items/42", None, &[]).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stderr);
    assert_eq!(record["statusCode"], 404);
    assert_eq!(
        record["error"],
        json!({"kind": "NOT_FOUND", "message": "Item 42 not found"})
    );
}

#[tokio::test]
async fn test_handler_failure_goes_to_stderr() {
    let app = TestApp::new();

    let response = app.request("GET", "/fail", None, &[]).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stderr);
    assert_eq!(record["error"]["kind"], "INTERNAL");
    assert_eq!(record["error"]["message"], "Something went wrong");
}

#[tokio::test]
async fn test_existing_item_goes_to_stdout() {
    let app = TestApp::new();

    let response = app.request("GET", "/items/1", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stdout);
    assert_eq!(record["responseBody"], "{\"id\":1,\"name\":\"sample\"}");
}

#[tokio::test]
async fn test_client_error_without_captured_error_goes_to_stderr() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/echo",
            Some("{broken"),
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stderr);
    assert_eq!(record["statusCode"], 400);
    assert!(record.get("error").is_none());
    assert_eq!(record["body"], "{broken");
}

#[tokio::test]
async fn test_request_id_is_recorded() {
    let app = TestApp::new();

    app.request("GET", "/health", None, &[("x-request-id", "req-7f3a")])
        .await;

    let (_, record) = app.only_record().await;
    assert_eq!(record["requestId"], "req-7f3a");
    assert_eq!(record["headers"]["x-request-id"], "req-7f3a");
}

#[tokio::test]
async fn test_nested_router_records_original_url() {
    let sink = MemorySink::new();
    let layer = ApiLoggerLayer::new(compact_config()).with_sink(sink.clone());
    let router = Router::new().nest("/api", build_router()).layer(layer);
    let app = TestApp { router, sink };

    let response = app.request("GET", "/api/health?verbose=1", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);

    let (_, record) = app.only_record().await;
    assert_eq!(record["url"], "/api/health?verbose=1");
    assert_eq!(record["queryParams"], json!({"verbose": "1"}));
}

#[tokio::test]
async fn test_pretty_output_is_multiline() {
    let app = TestApp::with_config(LoggerConfig::default());

    app.request("GET", "/health", None, &[]).await;
    app.records(1).await;

    let lines = app.sink.lines(LogStream::Stdout);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\n  \"method\": \"GET\""));
}

#[tokio::test]
async fn test_large_body_passes_through_unrecorded() {
    let app = TestApp::new();
    let payload = json!({ "data": "x".repeat(150 * 1024) }).to_string();

    let response = app
        .request(
            "POST",
            "/echo",
            Some(&payload),
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.raw.len(), payload.len());

    let (stream, record) = app.only_record().await;
    assert_eq!(stream, LogStream::Stdout);
    assert!(record.get("body").is_none());
    assert!(record.get("responseBody").is_none());
    assert_eq!(record["requestSize"], payload.len());
    assert_eq!(record["responseSize"], payload.len());
}

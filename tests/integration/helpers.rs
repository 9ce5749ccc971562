//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use apilog_api::{ApiLoggerLayer, build_app};
use apilog_core::config::LoggerConfig;
use apilog_core::sink::MemorySink;
use apilog_core::types::LogStream;

/// Test application context
pub struct TestApp {
    /// The demo router wrapped in the request logger
    pub router: Router,
    /// Collects every emitted record
    pub sink: MemorySink,
}

/// Response status and body as seen by the client
pub struct TestResponse {
    pub status: StatusCode,
    pub raw: Bytes,
    pub body: Value,
}

/// Logger settings used by most tests: defaults, compact output.
pub fn compact_config() -> LoggerConfig {
    LoggerConfig {
        pretty: false,
        ..Default::default()
    }
}

impl TestApp {
    /// Demo app with default logger options
    pub fn new() -> Self {
        Self::with_config(compact_config())
    }

    /// Demo app with the given logger options
    pub fn with_config(config: LoggerConfig) -> Self {
        Self::with_layer(|layer| layer, config)
    }

    /// Demo app whose logger is further customised by `customize`
    pub fn with_layer(
        customize: impl FnOnce(ApiLoggerLayer) -> ApiLoggerLayer,
        config: LoggerConfig,
    ) -> Self {
        let sink = MemorySink::new();
        let layer = customize(ApiLoggerLayer::new(config).with_sink(sink.clone()));
        Self {
            router: build_app(layer),
            sink,
        }
    }

    /// Send a request and read the whole response body
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = req
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_default())
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prepared request and read the whole response body
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let raw = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse { status, raw, body }
    }

    /// Wait until at least `expected` records were written, then return
    /// all of them parsed.
    pub async fn records(&self, expected: usize) -> Vec<(LogStream, Value)> {
        for _ in 0..200 {
            if self.sink.len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.sink
            .entries()
            .into_iter()
            .map(|(stream, line)| {
                let value = serde_json::from_str(&line).expect("record is not valid JSON");
                (stream, value)
            })
            .collect()
    }

    /// The single record emitted so far
    pub async fn only_record(&self) -> (LogStream, Value) {
        let mut records = self.records(1).await;
        assert_eq!(records.len(), 1, "expected exactly one record");
        records.remove(0)
    }
}

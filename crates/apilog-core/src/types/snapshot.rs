//! Framework-neutral views of the request and response being logged.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, Version};
use serde_json::{Map, Value};

use super::payload::{Payload, parse_urlencoded};

/// What the formatter needs to know about the incoming request.
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    pub method: String,
    /// Path and query as the client sent them.
    pub url: String,
    pub headers: HeaderMap,
    /// Parsed query string.
    pub query: Map<String, Value>,
    /// Parsed request body, if one was sent.
    pub body: Option<Payload>,
    pub http_version: String,
    /// Client address, empty when unknown.
    pub ip: String,
}

impl RequestSnapshot {
    /// Fill `query` by parsing the query component of `url`.
    pub fn with_query_from_url(mut self) -> Self {
        self.query = self
            .url
            .split_once('?')
            .map(|(_, q)| parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();
        self
    }

    /// First value of a request header as a string.
    pub fn header(&self, name: &str) -> Option<String> {
        header_string(&self.headers, name)
    }
}

/// What the formatter needs to know about the outgoing response.
#[derive(Debug, Clone, Default)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub headers: HeaderMap,
}

impl ResponseSnapshot {
    /// The response `Content-Type`, if set.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }
}

/// Render an HTTP version the way access logs usually print it (`"1.1"`).
pub fn http_version_string(version: Version) -> String {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
    .to_string()
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

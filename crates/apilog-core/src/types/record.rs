//! The structured record emitted once per request.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::payload::Payload;

/// Information about the client address, as returned by an IP-info lookup.
pub type IpInfo = Map<String, Value>;

/// Which standard stream a record belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    /// Successful requests.
    Stdout,
    /// Requests that failed (status >= 400) or carried an error.
    Stderr,
}

/// Request and response wall-clock times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// When the middleware first saw the request.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request: Option<String>,
    /// When the handler produced the response.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response: Option<String>,
}

impl Timestamp {
    /// A timestamp with the request time set to now.
    pub fn starting_now() -> Self {
        Self {
            request: Some(now_iso()),
            response: None,
        }
    }

    /// Set the response time to now unless it is already set.
    pub fn mark_response(&mut self) {
        if self.response.is_none() {
            self.response = Some(now_iso());
        }
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A header value: single, or a list when the header repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderField {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderField {
    /// Add another occurrence of the same header.
    pub fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                *self = Self::Multiple(vec![std::mem::take(first), value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

/// The serialisable form of an error captured during a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error category, e.g. `NOT_FOUND`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorDetail {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// One log line's worth of request/response data.
///
/// Optional fields that are `None` are omitted from the JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    /// Milliseconds, two decimal places.
    pub time_taken: f64,
    pub request_size: usize,
    pub response_size: usize,
    pub timestamp: Timestamp,
    pub headers: BTreeMap<String, HeaderField>,
    pub query_params: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_info: Option<IpInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_content_type: Option<String>,
    pub http_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub hostname: String,
}

impl LogRecord {
    /// Error records (status >= 400 or a captured error) go to stderr.
    pub fn stream(&self) -> LogStream {
        if self.error.is_some() || self.status_code >= 400 {
            LogStream::Stderr
        } else {
            LogStream::Stdout
        }
    }

    /// Serialise the record as a single JSON document.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

//! Request logger configuration.

use serde::{Deserialize, Serialize};

/// Options controlling what the request logger records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Include the request body in the record.
    #[serde(default = "default_true")]
    pub log_body: bool,
    /// Include the response body in the record.
    #[serde(default = "default_true")]
    pub log_response: bool,
    /// Include query parameters in the record (an empty map otherwise).
    #[serde(default = "default_true")]
    pub log_query_params: bool,
    /// Header names suppressed from the record, matched case-insensitively.
    #[serde(default)]
    pub excluded_headers: Vec<String>,
    /// Pretty-print records with two-space indentation.
    #[serde(default = "default_true")]
    pub pretty: bool,
    /// Take the client address from `X-Forwarded-For` when present.
    #[serde(default)]
    pub trust_proxy: bool,
    /// Largest request or response body copied into a record. Larger
    /// bodies are passed through untouched and left out of the record.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_body: true,
            log_response: true,
            log_query_params: true,
            excluded_headers: Vec::new(),
            pretty: true,
            trust_proxy: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Case-insensitive membership test against an excluded-header list.
pub fn is_excluded_header(excluded: &[String], name: &str) -> bool {
    excluded.iter().any(|h| h.eq_ignore_ascii_case(name))
}

fn default_true() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    100 * 1024
}

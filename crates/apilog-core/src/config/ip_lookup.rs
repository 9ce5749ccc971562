//! External IP-info lookup configuration.

use serde::{Deserialize, Serialize};

/// Settings for the HTTP-backed IP-info provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpLookupConfig {
    /// Whether the server wires an HTTP lookup into the logger.
    #[serde(default)]
    pub enabled: bool,
    /// Lookup endpoint. A `{ip}` placeholder is substituted; otherwise the
    /// address is appended as the last path segment.
    #[serde(default)]
    pub external_api_url: String,
    /// Number of attempts before the lookup is given up.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Per-attempt HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            external_api_url: String::new(),
            retry_limit: default_retry_limit(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_retry_limit() -> u32 {
    3
}

fn default_timeout() -> u64 {
    5
}

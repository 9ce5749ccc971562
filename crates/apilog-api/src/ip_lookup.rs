//! IP-info provider backed by an external HTTP lookup service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use apilog_core::config::IpLookupConfig;
use apilog_core::error::{AppError, ErrorKind};
use apilog_core::result::AppResult;
use apilog_core::traits::IpInfoProvider;
use apilog_core::types::IpInfo;

const PLACEHOLDER: &str = "{ip}";
const BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Looks addresses up with `GET` against a JSON endpoint, retrying failed
/// attempts with a linear backoff.
#[derive(Debug, Clone)]
pub struct HttpIpInfoProvider {
    client: reqwest::Client,
    url: String,
    retry_limit: u32,
}

impl HttpIpInfoProvider {
    pub fn new(config: &IpLookupConfig) -> AppResult<Self> {
        if config.external_api_url.trim().is_empty() {
            return Err(AppError::configuration(
                "ip_lookup.external_api_url must be set when ip_lookup is enabled",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build IP lookup client: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            client,
            url: config.external_api_url.clone(),
            retry_limit: config.retry_limit.max(1),
        })
    }

    /// The URL queried for `ip`.
    pub fn lookup_url(&self, ip: &str) -> String {
        if self.url.contains(PLACEHOLDER) {
            self.url.replace(PLACEHOLDER, ip)
        } else {
            format!("{}/{}", self.url.trim_end_matches('/'), ip)
        }
    }

    async fn fetch(&self, url: &str) -> AppResult<IpInfo> {
        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::IpLookup,
                format!("IP lookup request failed: {e}"),
                e,
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ip_lookup(format!("IP lookup returned {status}")));
        }

        let value: Value = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::IpLookup,
                format!("IP lookup returned invalid JSON: {e}"),
                e,
            )
        })?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::ip_lookup("IP lookup returned a non-object body")),
        }
    }
}

#[async_trait]
impl IpInfoProvider for HttpIpInfoProvider {
    async fn lookup(&self, ip: &str) -> AppResult<IpInfo> {
        if ip.is_empty() {
            return Ok(IpInfo::new());
        }

        let url = self.lookup_url(ip);
        let mut attempt = 1;
        loop {
            match self.fetch(&url).await {
                Ok(info) => return Ok(info),
                Err(e) if attempt < self.retry_limit => {
                    tracing::debug!(attempt, error = %e, "IP lookup attempt failed, retrying");
                    tokio::time::sleep(BACKOFF_STEP * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! IP-info lookup capability injected into the request logger.

use std::future::Future;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::IpInfo;

/// Resolves a client address into descriptive information (geo-location,
/// network owner, ...).
///
/// The logger awaits the lookup before emitting a record. An empty map
/// leaves `ipInfo` out of the record.
#[async_trait]
pub trait IpInfoProvider: Send + Sync + 'static {
    /// Look up `ip`. The address is an empty string when unknown.
    async fn lookup(&self, ip: &str) -> AppResult<IpInfo>;
}

/// Adapter turning an async closure into an [`IpInfoProvider`].
pub struct FnIpInfo<F> {
    f: F,
}

/// Wrap `f` as an [`IpInfoProvider`].
pub fn ip_info_fn<F, Fut>(f: F) -> FnIpInfo<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<IpInfo>> + Send + 'static,
{
    FnIpInfo { f }
}

#[async_trait]
impl<F, Fut> IpInfoProvider for FnIpInfo<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<IpInfo>> + Send + 'static,
{
    async fn lookup(&self, ip: &str) -> AppResult<IpInfo> {
        (self.f)(ip.to_string()).await
    }
}

//! Core traits defined in `apilog-core` and implemented by other crates.

pub mod ip_info;

pub use ip_info::{FnIpInfo, IpInfoProvider, ip_info_fn};

//! Core type definitions used across the apilog workspace.

pub mod payload;
pub mod record;
pub mod snapshot;

pub use payload::Payload;
pub use record::{ErrorDetail, HeaderField, IpInfo, LogRecord, LogStream, Timestamp};
pub use snapshot::{RequestSnapshot, ResponseSnapshot, http_version_string};

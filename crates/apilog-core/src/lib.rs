//! # apilog-core
//!
//! Core crate for apilog. Contains the log record and payload types, the
//! measurement functions, the record formatter, output sinks, the IP-info
//! capability trait, configuration schemas, and the unified error system.
//!
//! This crate has **no** dependency on the HTTP framework; the axum
//! adapter lives in `apilog-api`.

pub mod config;
pub mod error;
pub mod formatter;
pub mod metrics;
pub mod result;
pub mod sink;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

//! # apilog-api
//!
//! Axum integration for apilog.
//!
//! Provides the [`ApiLoggerLayer`] tower layer that emits one structured
//! record per request, the response-capturing body and lifecycle guard it
//! is built from, an HTTP-backed IP-info provider, error mapping, and a
//! small demo router.

pub mod app;
pub mod error;
pub mod handlers;
pub mod ip_lookup;
pub mod middleware;
pub mod router;

pub use app::{build_app, build_logger_layer, run_server};
pub use error::{ApiError, CapturedError, capture_error};
pub use middleware::logger::{ApiLogger, ApiLoggerLayer};
pub use router::build_router;

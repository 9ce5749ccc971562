//! Axum middleware stack.

pub mod body;
pub mod guard;
pub mod logger;

pub use body::CaptureBody;
pub use guard::{CapturedBody, Completion, CompletionGuard};
pub use logger::{ApiLogger, ApiLoggerLayer};

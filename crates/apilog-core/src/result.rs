//! Convenience result type alias for apilog.

use crate::error::AppError;

/// A specialized `Result` type for apilog operations.
pub type AppResult<T> = Result<T, AppError>;

//! Route definitions for the demo server.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers::{health, items};

/// Builds the demo router without any middleware.
pub fn build_router() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/echo", post(items::echo))
        .route("/items/{id}", get(items::get_item))
        .route("/fail", get(items::fail))
}

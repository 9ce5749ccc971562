//! Maps domain `AppError` to HTTP responses and records it for the logger.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use apilog_core::error::{AppError, ErrorKind};
use apilog_core::types::ErrorDetail;

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Response extension carrying the error a handler failed with.
///
/// The request logger attaches it to the record and routes the record to
/// the error stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError(pub ErrorDetail);

/// Attach `detail` to `response` so the request logger records it.
pub fn capture_error(response: &mut Response, detail: ErrorDetail) {
    response.extensions_mut().insert(CapturedError(detail));
}

/// Handler error type: an [`AppError`] rendered as JSON.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self.0.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ErrorKind::IpLookup => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ErrorKind::Configuration
            | ErrorKind::Serialization
            | ErrorKind::Io
            | ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Internal server error");
        }

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message: self.0.message.clone(),
            details: None,
        };

        let mut response = (status, Json(body)).into_response();
        capture_error(&mut response, self.0.detail());
        response
    }
}

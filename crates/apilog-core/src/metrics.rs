//! Timing and payload size measurement.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::Payload;

/// Size of `{}`, reported for requests without a body.
const EMPTY_OBJECT_SIZE: usize = 2;

/// Milliseconds elapsed since `start`, rounded to two decimal places.
pub fn calculate_time_taken(start: Instant) -> f64 {
    duration_to_millis(start.elapsed())
}

/// A duration in milliseconds, rounded to two decimal places.
pub fn duration_to_millis(duration: Duration) -> f64 {
    let millis = duration.as_secs_f64() * 1000.0;
    (millis * 100.0).round() / 100.0
}

/// Byte length of the JSON-serialised request body.
///
/// A missing (or falsy) body is measured as an empty object.
pub fn calculate_request_size(body: Option<&Payload>) -> usize {
    match body.filter(|b| b.is_truthy()) {
        Some(payload) => serialized_size(payload),
        None => EMPTY_OBJECT_SIZE,
    }
}

/// Byte length of the response body.
///
/// Text and binary payloads are measured directly; structured payloads by
/// their JSON serialisation. Absent or falsy payloads measure zero.
///
/// A `Payload::Json` holds a `serde_json::Value`, which always serialises,
/// so the zero-on-failure rule of [`serialized_size`] never applies here.
pub fn calculate_response_size(body: Option<&Payload>) -> usize {
    match body {
        Some(Payload::Text(text)) => text.len(),
        Some(Payload::Binary(bytes)) => bytes.len(),
        Some(payload @ Payload::Json(_)) if payload.is_truthy() => serialized_size(payload),
        _ => 0,
    }
}

/// Byte length of `value` serialised as JSON, or 0 if it cannot be
/// serialised.
pub fn serialized_size<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0)
}

//! Captured request/response bodies.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A body as it appears in a log record.
///
/// Serialises as a JSON string for text, as itself for JSON, and as a
/// base64 string for binary data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes.
    Binary(Bytes),
    /// A structured (parsed) body.
    Json(Value),
}

impl Payload {
    /// Whether the payload counts as present for conditional inclusion.
    ///
    /// Empty text and binary bodies are absent, as are the JSON values
    /// `null`, `false`, `0` and `""`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(text) => !text.is_empty(),
            Self::Binary(bytes) => !bytes.is_empty(),
            Self::Json(value) => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
        }
    }

    /// Interpret a buffered request body according to its content type.
    ///
    /// Returns `None` for an empty body.
    pub fn from_request_bytes(bytes: Bytes, content_type: Option<&str>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime == "application/json" || mime.ends_with("+json") {
            return Some(match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Self::Json(value),
                Err(_) => Self::from_text_or_binary(bytes),
            });
        }

        if mime == "application/x-www-form-urlencoded" {
            return Some(Self::Json(Value::Object(parse_urlencoded(&bytes))));
        }

        if mime.starts_with("text/") {
            return Some(Self::from_text_or_binary(bytes));
        }

        Some(Self::Binary(bytes))
    }

    /// Interpret captured response bytes: text when valid UTF-8, binary
    /// otherwise. Returns `None` for an empty body.
    pub fn from_response_bytes(bytes: Bytes) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Some(Self::from_text_or_binary(bytes))
    }

    fn from_text_or_binary(bytes: Bytes) -> Self {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Self::Text(text),
            Err(_) => Self::Binary(bytes),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Binary(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Self::Json(value) => value.serialize(serializer),
        }
    }
}

/// Parse `application/x-www-form-urlencoded` data (a query string or a
/// form body) into a JSON object. Repeated keys collect into an array.
pub fn parse_urlencoded(input: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    map
}

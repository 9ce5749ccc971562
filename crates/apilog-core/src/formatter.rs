//! Assembles a [`LogRecord`] from the pieces gathered during a request.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use http::HeaderMap;
use http::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use serde_json::Map;
use sysinfo::System;

use crate::config::logger::is_excluded_header;
use crate::types::{
    ErrorDetail, HeaderField, IpInfo, LogRecord, Payload, RequestSnapshot, ResponseSnapshot,
    Timestamp,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Inputs to [`format_log_data`].
#[derive(Debug, Clone)]
pub struct FormatLogDataParams<'a> {
    pub request: &'a RequestSnapshot,
    pub response: &'a ResponseSnapshot,
    pub response_body: Option<&'a Payload>,
    pub time_taken: f64,
    pub excluded_headers: &'a [String],
    pub ip_info: IpInfo,
    pub log_body: bool,
    pub log_response: bool,
    pub timestamp: Timestamp,
    pub request_size: usize,
    pub response_size: usize,
    pub log_query_params: bool,
    pub error: Option<&'a ErrorDetail>,
}

/// Build the record for one request.
///
/// `body`, `responseBody`, `ipInfo` and `error` are only set when their
/// source is present and, for the bodies, the matching flag is on.
pub fn format_log_data(params: FormatLogDataParams<'_>) -> LogRecord {
    let FormatLogDataParams {
        request,
        response,
        response_body,
        time_taken,
        excluded_headers,
        ip_info,
        log_body,
        log_response,
        timestamp,
        request_size,
        response_size,
        log_query_params,
        error,
    } = params;

    let query_params = if log_query_params {
        request.query.clone()
    } else {
        Map::new()
    };

    let body = request
        .body
        .as_ref()
        .filter(|b| log_body && b.is_truthy())
        .cloned();

    let response_body = response_body
        .filter(|b| log_response && b.is_truthy())
        .cloned();

    let ip_info = (!ip_info.is_empty()).then_some(ip_info);

    LogRecord {
        method: request.method.clone(),
        url: request.url.clone(),
        status_code: response.status_code,
        time_taken,
        request_size,
        response_size,
        timestamp,
        headers: filter_headers(&request.headers, excluded_headers),
        query_params,
        body,
        response_body,
        ip_info,
        error: error.cloned(),
        user_agent: request.header(USER_AGENT.as_str()),
        referer: request.header(REFERER.as_str()),
        request_content_type: request.header(CONTENT_TYPE.as_str()),
        response_content_type: response.content_type(),
        http_version: request.http_version.clone(),
        request_id: request.header(REQUEST_ID_HEADER),
        hostname: hostname().to_string(),
    }
}

/// Copy headers into the record's map, dropping excluded names.
///
/// Header names are lowercase (as stored by `http`); excluded names are
/// compared without regard to case.
pub fn filter_headers(headers: &HeaderMap, excluded: &[String]) -> BTreeMap<String, HeaderField> {
    let mut filtered: BTreeMap<String, HeaderField> = BTreeMap::new();
    for (name, value) in headers {
        if is_excluded_header(excluded, name.as_str()) {
            continue;
        }
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match filtered.get_mut(name.as_str()) {
            Some(field) => field.push(value),
            None => {
                filtered.insert(name.as_str().to_string(), HeaderField::Single(value));
            }
        }
    }
    filtered
}

/// Name of the host this process runs on. Resolved once.
pub fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(resolve_hostname)
}

fn resolve_hostname() -> String {
    System::host_name()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

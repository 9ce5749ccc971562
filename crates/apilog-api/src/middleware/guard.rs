//! Exactly-once emission of a request's log record.
//!
//! A response can complete in more than one way: its body streams to the
//! end, the body is dropped before that (client went away), the body
//! stream fails, or the inner service fails outright. Every path calls
//! [`CompletionGuard::fire`]; only the first call emits.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use bytes::Bytes;

use apilog_core::formatter::{FormatLogDataParams, format_log_data};
use apilog_core::metrics::{calculate_request_size, calculate_response_size, calculate_time_taken};
use apilog_core::sink::write_record;
use apilog_core::traits::IpInfoProvider;
use apilog_core::types::{
    ErrorDetail, IpInfo, Payload, RequestSnapshot, ResponseSnapshot, Timestamp,
};

use super::logger::LoggerShared;

/// The signal that completed a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The body was streamed to its end.
    Finished,
    /// The response was abandoned or failed before the body ended.
    Closed,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finish"),
            Self::Closed => write!(f, "close"),
        }
    }
}

/// What a response body left behind for the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedBody {
    /// The streamed bytes, when they were kept and fit the capture limit.
    pub bytes: Option<Bytes>,
    /// Total bytes streamed.
    pub size: usize,
}

/// Everything gathered about a request before its response completes.
pub(crate) struct PendingRecord {
    pub start: Instant,
    pub timestamp: Timestamp,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
    pub error: Option<ErrorDetail>,
    /// Bytes streamed to the inner service of a body too large to capture.
    pub request_streamed: Option<Arc<AtomicUsize>>,
    pub shared: Arc<LoggerShared>,
}

struct Measured {
    time_taken: f64,
    request_size: usize,
    response_size: usize,
    response_body: Option<Payload>,
}

impl PendingRecord {
    fn emit(self, signal: Completion, captured: CapturedBody) {
        let response_body = captured.bytes.and_then(Payload::from_response_bytes);
        let response_size = match &response_body {
            Some(body) => calculate_response_size(Some(body)),
            None => captured.size,
        };
        let measured = Measured {
            time_taken: calculate_time_taken(self.start),
            request_size: match &self.request_streamed {
                Some(streamed) => streamed.load(Ordering::Relaxed),
                None => calculate_request_size(self.request.body.as_ref()),
            },
            response_size,
            response_body,
        };

        tracing::debug!(
            signal = %signal,
            method = %self.request.method,
            url = %self.request.url,
            status = self.response.status_code,
            time_taken_ms = measured.time_taken,
            "Request completed"
        );

        let Some(provider) = self.shared.ip_info.clone() else {
            self.finish(measured, IpInfo::new());
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let ip_info = lookup_ip_info(provider.as_ref(), &self.request.ip).await;
                    self.finish(measured, ip_info);
                });
            }
            Err(_) => {
                tracing::warn!("No async runtime for IP lookup, logging without ipInfo");
                self.finish(measured, IpInfo::new());
            }
        }
    }

    fn finish(self, measured: Measured, ip_info: IpInfo) {
        let config = &self.shared.config;
        let record = format_log_data(FormatLogDataParams {
            request: &self.request,
            response: &self.response,
            response_body: measured.response_body.as_ref(),
            time_taken: measured.time_taken,
            excluded_headers: &config.excluded_headers,
            ip_info,
            log_body: config.log_body,
            log_response: config.log_response,
            timestamp: self.timestamp,
            request_size: measured.request_size,
            response_size: measured.response_size,
            log_query_params: config.log_query_params,
            error: self.error.as_ref(),
        });
        write_record(self.shared.sink.as_ref(), &record, config.pretty);
    }
}

async fn lookup_ip_info(provider: &dyn IpInfoProvider, ip: &str) -> IpInfo {
    match provider.lookup(ip).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(error = %e, ip = %ip, "IP info lookup failed");
            IpInfo::new()
        }
    }
}

/// Holds a request's pending record until the first completion signal.
pub struct CompletionGuard {
    pending: Option<PendingRecord>,
}

impl CompletionGuard {
    pub(crate) fn new(pending: PendingRecord) -> Self {
        Self {
            pending: Some(pending),
        }
    }

    /// Emit the record with what was captured of the response body.
    ///
    /// Returns `true` if this call emitted; later calls do nothing and
    /// return `false`.
    pub fn fire(&mut self, signal: Completion, captured: CapturedBody) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.emit(signal, captured);
                true
            }
            None => false,
        }
    }

    /// Whether a completion signal has already been handled.
    pub fn has_fired(&self) -> bool {
        self.pending.is_none()
    }
}

impl fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGuard")
            .field("fired", &self.has_fired())
            .finish()
    }
}

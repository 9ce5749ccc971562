//! Request/response logging layer.
//!
//! Wraps an axum service and emits one structured [`LogRecord`] per
//! request: method, URL, status, timing, body sizes, filtered headers,
//! query parameters, optional bodies, IP info, and captured errors.
//!
//! [`LogRecord`]: apilog_core::types::LogRecord

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, OriginalUri};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, Response};
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt, stream};
use http_body::Frame;
use http_body_util::{BodyExt, BodyStream, StreamBody};
use serde_json::Map;
use tower::{Layer, Service};

use apilog_core::config::LoggerConfig;
use apilog_core::error::ErrorKind;
use apilog_core::sink::{LogSink, StdioSink};
use apilog_core::traits::IpInfoProvider;
use apilog_core::types::{
    ErrorDetail, Payload, RequestSnapshot, ResponseSnapshot, Timestamp, http_version_string,
};

use super::body::CaptureBody;
use super::guard::{CapturedBody, Completion, CompletionGuard, PendingRecord};
use crate::error::CapturedError;

/// State shared by every request passing through one logger.
#[derive(Clone)]
pub(crate) struct LoggerShared {
    pub config: LoggerConfig,
    pub sink: Arc<dyn LogSink>,
    pub ip_info: Option<Arc<dyn IpInfoProvider>>,
}

impl LoggerShared {
    pub(crate) fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            sink: Arc::new(StdioSink),
            ip_info: None,
        }
    }

    pub(crate) fn with_sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub(crate) fn with_ip_info(mut self, provider: impl IpInfoProvider) -> Self {
        self.ip_info = Some(Arc::new(provider));
        self
    }
}

/// Tower layer producing [`ApiLogger`] services.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/health", get(health))
///     .layer(ApiLoggerLayer::new(LoggerConfig::default()));
/// ```
#[derive(Clone)]
pub struct ApiLoggerLayer {
    shared: Arc<LoggerShared>,
}

impl ApiLoggerLayer {
    /// A logger writing to stdout/stderr with no IP lookup.
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            shared: Arc::new(LoggerShared::new(config)),
        }
    }

    /// Write records to `sink` instead of the standard streams.
    pub fn with_sink(self, sink: impl LogSink) -> Self {
        self.map_shared(|shared| shared.with_sink(sink))
    }

    /// Resolve client addresses through `provider` before emitting.
    pub fn with_ip_info(self, provider: impl IpInfoProvider) -> Self {
        self.map_shared(|shared| shared.with_ip_info(provider))
    }

    fn map_shared(self, f: impl FnOnce(LoggerShared) -> LoggerShared) -> Self {
        let shared = Arc::unwrap_or_clone(self.shared);
        Self {
            shared: Arc::new(f(shared)),
        }
    }
}

impl Default for ApiLoggerLayer {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

impl fmt::Debug for ApiLoggerLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiLoggerLayer")
            .field("config", &self.shared.config)
            .field("sink", &self.shared.sink)
            .field("ip_info", &self.shared.ip_info.is_some())
            .finish()
    }
}

impl<S> Layer<S> for ApiLoggerLayer {
    type Service = ApiLogger<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiLogger {
            inner,
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Service that records each request passing through it.
#[derive(Clone)]
pub struct ApiLogger<S> {
    inner: S,
    shared: Arc<LoggerShared>,
}

impl<S> Service<Request<Body>> for ApiLogger<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let shared = Arc::clone(&self.shared);

        Box::pin(async move {
            let start = Instant::now();
            let timestamp = Timestamp::starting_now();

            let (parts, body) = request.into_parts();
            let buffered = buffer_request_body(body, shared.config.max_body_bytes).await;

            let content_type = parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let payload = buffered
                .bytes
                .and_then(|bytes| Payload::from_request_bytes(bytes, content_type));
            let context = RequestContext {
                start,
                timestamp,
                request: request_snapshot(&parts, payload, &shared.config),
                request_streamed: buffered.streamed,
                shared,
            };

            let request = Request::from_parts(parts, buffered.body);
            match inner.call(request).await {
                Ok(response) => Ok(capture_response(response, context)),
                Err(err) => {
                    let response = ResponseSnapshot {
                        status_code: 500,
                        headers: HeaderMap::new(),
                    };
                    let error = ErrorDetail::new(ErrorKind::Internal.to_string(), err.to_string());
                    CompletionGuard::new(context.into_pending(response, Some(error)))
                        .fire(Completion::Closed, CapturedBody::default());
                    Err(err)
                }
            }
        })
    }
}

/// What is known about a request before the inner service answers.
struct RequestContext {
    start: Instant,
    timestamp: Timestamp,
    request: RequestSnapshot,
    request_streamed: Option<Arc<AtomicUsize>>,
    shared: Arc<LoggerShared>,
}

impl RequestContext {
    /// Stamp the response time and pair the request with its response.
    fn into_pending(self, response: ResponseSnapshot, error: Option<ErrorDetail>) -> PendingRecord {
        let mut timestamp = self.timestamp;
        timestamp.mark_response();
        PendingRecord {
            start: self.start,
            timestamp,
            request: self.request,
            response,
            error,
            request_streamed: self.request_streamed,
            shared: self.shared,
        }
    }
}

/// Wrap the response body so the record is emitted when the response
/// completes.
fn capture_response(response: Response<Body>, context: RequestContext) -> Response<Body> {
    let (parts, body) = response.into_parts();
    let snapshot = ResponseSnapshot {
        status_code: parts.status.as_u16(),
        headers: parts.headers.clone(),
    };
    let error = parts
        .extensions
        .get::<CapturedError>()
        .map(|captured| captured.0.clone());

    let config = &context.shared.config;
    let limit = config.log_response.then_some(config.max_body_bytes);
    let guard = CompletionGuard::new(context.into_pending(snapshot, error));
    Response::from_parts(parts, Body::new(CaptureBody::new(body, guard, limit)))
}

/// A request body after the logger has looked at it.
struct BufferedRequest {
    /// The body handed to the inner service, always complete.
    body: Body,
    /// The whole body, when it fit the capture limit and read cleanly.
    bytes: Option<Bytes>,
    /// Bytes read so far of a body too large to capture: the prefix read
    /// here plus whatever the inner service reads after it.
    streamed: Option<Arc<AtomicUsize>>,
}

/// Read up to `limit` bytes of `body`.
///
/// Frames read here are replayed ahead of the rest of the stream, so the
/// inner service sees exactly what the client sent, read errors included.
async fn buffer_request_body(mut body: Body, limit: usize) -> BufferedRequest {
    let mut frames: Vec<Result<Frame<Bytes>, axum::Error>> = Vec::new();
    let mut buffered = BytesMut::new();

    loop {
        match body.frame().await {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    buffered.extend_from_slice(data);
                }
                frames.push(Ok(frame));
                if buffered.len() > limit {
                    tracing::debug!(limit, "Request body exceeds capture limit, not recording it");
                    let streamed = Arc::new(AtomicUsize::new(buffered.len()));
                    let counter = Arc::clone(&streamed);
                    let rest = BodyStream::new(body).inspect_ok(move |frame| {
                        if let Some(data) = frame.data_ref() {
                            counter.fetch_add(data.len(), Ordering::Relaxed);
                        }
                    });
                    let replayed = stream::iter(frames).chain(rest);
                    return BufferedRequest {
                        body: Body::new(StreamBody::new(replayed)),
                        bytes: None,
                        streamed: Some(streamed),
                    };
                }
            }
            Some(Err(err)) => {
                tracing::warn!(
                    error = %err,
                    "Failed to read request body, forwarding it unrecorded"
                );
                frames.push(Err(err));
                return BufferedRequest {
                    body: replay(frames),
                    bytes: None,
                    streamed: None,
                };
            }
            None => {
                return BufferedRequest {
                    body: replay(frames),
                    bytes: Some(buffered.freeze()),
                    streamed: None,
                };
            }
        }
    }
}

fn replay(frames: Vec<Result<Frame<Bytes>, axum::Error>>) -> Body {
    Body::new(StreamBody::new(stream::iter(frames)))
}

fn request_snapshot(parts: &Parts, body: Option<Payload>, config: &LoggerConfig) -> RequestSnapshot {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or(&parts.uri);
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    RequestSnapshot {
        method: parts.method.to_string(),
        url,
        headers: parts.headers.clone(),
        query: Map::new(),
        body,
        http_version: http_version_string(parts.version),
        ip: client_ip(parts, config.trust_proxy),
    }
    .with_query_from_url()
}

/// The client address: the first `X-Forwarded-For` hop when proxies are
/// trusted, otherwise the peer address. Empty when neither is known.
fn client_ip(parts: &Parts, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

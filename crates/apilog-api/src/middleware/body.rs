//! Response body wrapper that captures the outgoing payload.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use super::guard::{CapturedBody, Completion, CompletionGuard};

pin_project! {
    /// Counts every data frame of the inner body, copies them up to a
    /// limit, and fires the completion guard when the stream ends, fails,
    /// or is dropped.
    pub struct CaptureBody<B> {
        #[pin]
        inner: B,
        capture: Capture,
        guard: CompletionGuard,
    }

    impl<B> PinnedDrop for CaptureBody<B> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            this.guard.fire(Completion::Closed, this.capture.take());
        }
    }
}

impl<B> CaptureBody<B> {
    /// Wrap `inner`. With `limit` set, up to that many bytes are kept for
    /// the record; with `None` only the size is counted.
    pub fn new(inner: B, guard: CompletionGuard, limit: Option<usize>) -> Self {
        Self {
            inner,
            capture: Capture::new(limit),
            guard,
        }
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.capture.record(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(err)) => {
                this.guard.fire(Completion::Closed, this.capture.take());
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.guard.fire(Completion::Finished, this.capture.take());
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Running size of a body plus its bytes while they fit the limit.
///
/// `limit` becomes `None` once the body outgrows it, and the buffer is
/// released.
#[derive(Debug)]
struct Capture {
    buffer: BytesMut,
    size: usize,
    limit: Option<usize>,
}

impl Capture {
    fn new(limit: Option<usize>) -> Self {
        Self {
            buffer: BytesMut::new(),
            size: 0,
            limit,
        }
    }

    fn record(&mut self, chunk: &[u8]) {
        self.size += chunk.len();
        match self.limit {
            Some(limit) if self.size <= limit => self.buffer.extend_from_slice(chunk),
            Some(_) => {
                self.limit = None;
                self.buffer = BytesMut::new();
            }
            None => {}
        }
    }

    fn take(&mut self) -> CapturedBody {
        CapturedBody {
            bytes: self.limit.map(|_| self.buffer.split().freeze()),
            size: std::mem::take(&mut self.size),
        }
    }
}

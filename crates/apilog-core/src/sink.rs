//! Output destinations for serialised log records.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::{LogRecord, LogStream};

/// Where serialised records are written.
pub trait LogSink: Send + Sync + std::fmt::Debug + 'static {
    /// Write one serialised record to `stream`.
    fn write(&self, stream: LogStream, line: &str) -> AppResult<()>;
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn write(&self, stream: LogStream, line: &str) -> AppResult<()> {
        (**self).write(stream, line)
    }
}

/// Serialise `record` and hand it to `sink` on the stream it belongs to.
///
/// Failures are reported through `tracing` and never propagate.
pub fn write_record(sink: &dyn LogSink, record: &LogRecord, pretty: bool) {
    let stream = record.stream();
    let line = match record.to_json(pretty) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, url = %record.url, "Failed to serialize request log record");
            return;
        }
    };
    if let Err(e) = sink.write(stream, &line) {
        tracing::warn!(error = %e, ?stream, "Failed to write request log record");
    }
}

/// Writes records to the process's standard output and standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl LogSink for StdioSink {
    fn write(&self, stream: LogStream, line: &str) -> AppResult<()> {
        match stream {
            LogStream::Stdout => writeln!(std::io::stdout().lock(), "{line}")?,
            LogStream::Stderr => writeln!(std::io::stderr().lock(), "{line}")?,
        }
        Ok(())
    }
}

/// Keeps records in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<(LogStream, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record written so far.
    pub fn entries(&self) -> Vec<(LogStream, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Records written to one stream.
    pub fn lines(&self, stream: LogStream) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line)
            .collect()
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn write(&self, stream: LogStream, line: &str) -> AppResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::internal("memory sink lock poisoned"))?;
        entries.push((stream, line.to_string()));
        Ok(())
    }
}

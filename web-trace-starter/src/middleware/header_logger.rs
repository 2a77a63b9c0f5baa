use axum::extract::{Request, State};
use axum::http::HeaderName;
use axum::{middleware::Next, response::Response};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const REDACTED: &str = "[redacted]";

/// One inbound header, tagged with the request it arrived on.
///
/// `name` is the lowercase form `http` stores (`user-agent`, not
/// `User-Agent`); header names are case-insensitive on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub method: String,
    pub uri: String,
    pub name: String,
    pub value: String,
}

impl fmt::Display for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(Debug, Error)]
#[error("Log sink unavailable: {0}")]
pub struct LogSinkError(pub String);

/// Destination for header records. Shared across concurrent requests.
pub trait LogSink: Send + Sync + 'static {
    fn write(&self, record: &HeaderRecord) -> Result<(), LogSinkError>;
}

/// Emits each record as an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, record: &HeaderRecord) -> Result<(), LogSinkError> {
        info!(
            method = %record.method,
            uri = %record.uri,
            header = %record.name,
            value = %record.value,
            "{}",
            record
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct HeaderLoggerState {
    sink: Arc<dyn LogSink>,
    redacted: Arc<HashSet<HeaderName>>,
}

impl HeaderLoggerState {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            redacted: Arc::new(HashSet::new()),
        }
    }

    /// Header names whose values are replaced by `[redacted]`. Names that
    /// are not valid header names are ignored with a warning.
    pub fn with_redacted_headers<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let redacted = names
            .into_iter()
            .filter_map(|name| match HeaderName::try_from(name.as_ref()) {
                Ok(header) => Some(header),
                Err(_) => {
                    warn!(header = %name.as_ref(), "Ignoring invalid redacted header name");
                    None
                }
            })
            .collect();
        self.redacted = Arc::new(redacted);
        self
    }

    fn records(&self, req: &Request) -> Vec<HeaderRecord> {
        let method = req.method().to_string();
        let uri = req.uri().to_string();

        req.headers()
            .iter()
            .map(|(name, value)| HeaderRecord {
                method: method.clone(),
                uri: uri.clone(),
                name: name.as_str().to_string(),
                value: if self.redacted.contains(name) {
                    REDACTED.to_string()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                },
            })
            .collect()
    }
}

impl Default for HeaderLoggerState {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogSink))
    }
}

/// Writes every inbound header to the log sink, then continues the chain.
///
/// Neither the request nor the response is touched. Sink failures are
/// reported once per failing record and never fail the request.
pub async fn header_logger_middleware(
    State(state): State<HeaderLoggerState>,
    req: Request,
    next: Next,
) -> Response {
    for record in state.records(&req) {
        if let Err(e) = state.sink.write(&record) {
            warn!(error = %e, header = %record.name, "Failed to log request header");
        }
    }

    next.run(req).await
}

//! Ambient trace-context lookup.
//!
//! The middleware never reaches for global state on its own: it hands the
//! inbound request to a [`TraceContextProvider`], which decides where the
//! current trace lives. Three sources are provided:
//!
//! - the OpenTelemetry context of the current `tracing` span,
//! - a [`TraceContext`] inserted into the request extensions upstream,
//! - the inbound W3C `traceparent` header.
//!
//! See: https://www.w3.org/TR/trace-context/

use axum::extract::Request;
use axum::http::HeaderMap;
use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use serde::Deserialize;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// The trace identifier observed for the request being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: String,
}

impl TraceContext {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

#[derive(Debug, Error)]
pub enum TraceContextError {
    #[error("Malformed traceparent header: {0}")]
    MalformedTraceparent(String),

    #[error("Trace context unavailable: {0}")]
    Unavailable(anyhow::Error),
}

/// Source of the trace context for an inbound request.
///
/// Implementations are shared across every concurrent request and must not
/// block.
pub trait TraceContextProvider: Send + Sync + 'static {
    fn current_context(&self, request: &Request)
    -> Result<Option<TraceContext>, TraceContextError>;
}

/// Which built-in provider the starter installs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceContextSource {
    #[default]
    Span,
    Extension,
    Traceparent,
}

/// Reads the trace id of the OpenTelemetry span attached to the current
/// `tracing` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanTraceContextProvider;

impl TraceContextProvider for SpanTraceContextProvider {
    fn current_context(
        &self,
        _request: &Request,
    ) -> Result<Option<TraceContext>, TraceContextError> {
        Ok(current_span_context())
    }
}

/// Trace context of the current `tracing` span, if it carries a valid
/// OpenTelemetry span context.
pub fn current_span_context() -> Option<TraceContext> {
    let span = Span::current();
    let context = span.context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();

    if span_context.is_valid() {
        Some(TraceContext::new(span_context.trace_id().to_string()))
    } else {
        None
    }
}

/// Reads a [`TraceContext`] that an upstream layer stored in the request
/// extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionTraceContextProvider;

impl TraceContextProvider for ExtensionTraceContextProvider {
    fn current_context(
        &self,
        request: &Request,
    ) -> Result<Option<TraceContext>, TraceContextError> {
        Ok(request.extensions().get::<TraceContext>().cloned())
    }
}

/// Extracts the trace id from the inbound `traceparent` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceparentTraceContextProvider;

impl TraceContextProvider for TraceparentTraceContextProvider {
    fn current_context(
        &self,
        request: &Request,
    ) -> Result<Option<TraceContext>, TraceContextError> {
        let Some(value) = request.headers().get(TRACEPARENT_HEADER) else {
            return Ok(None);
        };

        let context = extract_remote_context(request.headers());
        let span = context.span();
        let span_context = span.span_context();

        if span_context.is_valid() {
            Ok(Some(TraceContext::new(span_context.trace_id().to_string())))
        } else {
            Err(TraceContextError::MalformedTraceparent(
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ))
        }
    }
}

/// A text map extractor for HTTP headers.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Remote parent context carried by the inbound W3C trace headers. The
/// returned context has no valid span when the headers are missing or
/// malformed.
pub fn extract_remote_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

//! Registers the request filters on a host application's router.
//!
//! Whether a filter is installed is decided once, at startup, from
//! [`StarterConfig`]; the host can swap either collaborator before calling
//! [`TraceStarter::install`].

use crate::config::{FilterConfig, StarterConfig};
use crate::middleware::header_logger::{
    HeaderLoggerState, LogSink, TracingLogSink, header_logger_middleware,
};
use crate::middleware::trace_id::{SharedTraceContextProvider, trace_id_middleware};
use crate::observability::trace_context::{
    ExtensionTraceContextProvider, SpanTraceContextProvider, TraceContextProvider,
    TraceContextSource, TraceparentTraceContextProvider, extract_remote_context,
};
use crate::propagation::ContextPropagatingSpawner;
use axum::{Router, body::Body, http::Request, middleware::from_fn_with_state};
use opentelemetry::trace::TraceContextExt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct TraceStarter {
    filters: FilterConfig,
    task_propagation: bool,
    provider: SharedTraceContextProvider,
    sink: Arc<dyn LogSink>,
}

impl TraceStarter {
    pub fn from_config(config: &StarterConfig) -> Self {
        Self {
            filters: config.filters.clone(),
            task_propagation: config.task_propagation.enabled,
            provider: provider_for(config.filters.trace_id.source),
            sink: Arc::new(TracingLogSink),
        }
    }

    pub fn with_trace_context_provider<P: TraceContextProvider>(mut self, provider: P) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn with_log_sink<L: LogSink>(mut self, sink: L) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Layers the enabled filters onto `router`.
    ///
    /// The request span is the outermost layer so both filters run inside
    /// it; the trace-id annotator wraps the header logger.
    pub fn install<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut router = router;

        if self.filters.header_logger.enabled {
            let state = HeaderLoggerState::new(self.sink.clone())
                .with_redacted_headers(&self.filters.header_logger.redacted_headers);
            router = router.layer(from_fn_with_state(state, header_logger_middleware));
        }

        if self.filters.trace_id.enabled {
            router = router.layer(from_fn_with_state(
                self.provider.clone(),
                trace_id_middleware,
            ));
        }

        if self.filters.request_span.enabled {
            router = router.layer(TraceLayer::new_for_http().make_span_with(make_request_span));
        }

        tracing::info!(
            request_span = self.filters.request_span.enabled,
            trace_id_filter = self.filters.trace_id.enabled,
            header_logger_filter = self.filters.header_logger.enabled,
            "Request filters installed"
        );

        router
    }

    /// Spawner for background work, when task propagation is enabled.
    pub fn spawner(&self) -> Option<ContextPropagatingSpawner> {
        self.task_propagation
            .then(ContextPropagatingSpawner::new)
    }
}

/// Opens the `http_request` span. An inbound `traceparent` becomes its
/// remote parent, so the span continues the caller's trace.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let span = tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
    );

    let remote = extract_remote_context(request.headers());
    if remote.span().span_context().is_valid() {
        span.set_parent(remote);
    }

    span
}

fn provider_for(source: TraceContextSource) -> SharedTraceContextProvider {
    match source {
        TraceContextSource::Span => Arc::new(SpanTraceContextProvider),
        TraceContextSource::Extension => Arc::new(ExtensionTraceContextProvider),
        TraceContextSource::Traceparent => Arc::new(TraceparentTraceContextProvider),
    }
}

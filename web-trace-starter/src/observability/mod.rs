pub mod logging;
pub mod trace_context;

pub use logging::init_tracing;
pub use trace_context::{
    ExtensionTraceContextProvider, HeaderExtractor, SpanTraceContextProvider, TRACEPARENT_HEADER,
    TraceContext, TraceContextError, TraceContextProvider, TraceContextSource,
    TraceparentTraceContextProvider, current_span_context, extract_remote_context,
};

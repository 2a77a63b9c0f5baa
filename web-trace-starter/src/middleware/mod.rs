pub mod header_logger;
pub mod trace_id;

pub use header_logger::{
    HeaderLoggerState, HeaderRecord, LogSink, LogSinkError, TracingLogSink,
    header_logger_middleware,
};
pub use trace_id::{SharedTraceContextProvider, TRACE_ID_HEADER, trace_id_middleware};

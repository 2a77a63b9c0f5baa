use thiserror::Error;

/// Errors raised while bootstrapping the starter.
///
/// Request-time failures never end up here: a missing trace context or a
/// broken log sink is logged by the middleware and the request proceeds.
#[derive(Debug, Error)]
pub enum StarterError {
    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Tracing initialization error: {0}")]
    TracingInit(anyhow::Error),
}

impl From<config::ConfigError> for StarterError {
    fn from(err: config::ConfigError) -> Self {
        StarterError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<opentelemetry::trace::TraceError> for StarterError {
    fn from(err: opentelemetry::trace::TraceError) -> Self {
        StarterError::TracingInit(anyhow::Error::new(err))
    }
}

impl From<tracing_subscriber::util::TryInitError> for StarterError {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        StarterError::TracingInit(anyhow::Error::new(err))
    }
}

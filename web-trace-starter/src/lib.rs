//! web-trace-starter: request filters that expose the trace id and log
//! inbound headers for axum services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod propagation;
pub mod starter;

pub use config::StarterConfig;
pub use error::StarterError;
pub use starter::TraceStarter;

pub use axum;
pub use tokio;
pub use tracing;

//! Test helpers for web-trace-starter integration tests.
//!
//! Provides an in-process OpenTelemetry tracer and a recording log sink.

#![allow(dead_code)]

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use web_trace_starter::middleware::{HeaderRecord, LogSink, LogSinkError};

/// Keeps the SDK provider alive while the thread-local subscriber is set;
/// spans created after the provider is dropped carry no valid context.
pub struct TestTracing {
    _provider: TracerProvider,
    _guard: DefaultGuard,
}

/// Installs a subscriber with an OpenTelemetry layer for the current thread.
/// Pair with the default current-thread `#[tokio::test]` runtime.
pub fn init_test_tracing() -> TestTracing {
    let provider = TracerProvider::builder().build();
    let tracer = provider.tracer("web-trace-starter-test");

    let subscriber =
        tracing_subscriber::registry().with(tracing_opentelemetry::layer().with_tracer(tracer));

    TestTracing {
        _provider: provider,
        _guard: tracing::subscriber::set_default(subscriber),
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<HeaderRecord>>>,
}

impl RecordingSink {
    pub fn rendered(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect()
    }

    pub fn records(&self) -> Vec<HeaderRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn write(&self, record: &HeaderRecord) -> Result<(), LogSinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

//! Carries the caller's span, and with it the trace id, into work that
//! leaves the request task.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::Instrument;
use tracing::instrument::Instrumented;

/// Binds `future` to the span that is current at the call site.
pub fn propagate<F: Future>(future: F) -> Instrumented<F> {
    future.in_current_span()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPropagatingSpawner;

impl ContextPropagatingSpawner {
    pub fn new() -> Self {
        Self
    }

    /// Spawns onto the tokio runtime with the caller's span attached.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(propagate(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Span;

    #[tokio::test]
    async fn test_spawned_task_runs_in_caller_span() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());

        let span = tracing::info_span!("request");
        let expected = span.id();

        let seen = async { ContextPropagatingSpawner::new().spawn(async { Span::current().id() }) }
            .instrument(span)
            .await
            .await
            .unwrap();

        assert!(expected.is_some());
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_spawn_outside_span() {
        let handle = ContextPropagatingSpawner::new().spawn(async { 40 + 2 });
        assert_eq!(handle.await.unwrap(), 42);
    }
}

use crate::observability::trace_context::TraceContextProvider;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::{middleware::Next, response::Response};
use std::sync::Arc;
use tracing::warn;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

pub type SharedTraceContextProvider = Arc<dyn TraceContextProvider>;

/// Copies the current trace id onto the response as `X-Trace-Id`.
///
/// The context is read before the request continues down the chain. A
/// provider failure is treated as "no trace" and the request proceeds.
/// A value already set by a downstream handler is kept.
pub async fn trace_id_middleware(
    State(provider): State<SharedTraceContextProvider>,
    req: Request,
    next: Next,
) -> Response {
    let header_value = match provider.current_context(&req) {
        Ok(Some(context)) if !context.trace_id().is_empty() => {
            match HeaderValue::from_str(context.trace_id()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(
                        trace_id = %context.trace_id(),
                        "Trace id is not a valid header value, skipping X-Trace-Id"
                    );
                    None
                }
            }
        }
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read trace context, skipping X-Trace-Id");
            None
        }
    };

    let mut response = next.run(req).await;

    if let Some(value) = header_value {
        response
            .headers_mut()
            .entry(TRACE_ID_HEADER)
            .or_insert(value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::trace_context::{TraceContext, TraceContextError};
    use axum::{Router, body::Body, middleware::from_fn_with_state, routing::get};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct StaticProvider(Option<&'static str>);

    impl TraceContextProvider for StaticProvider {
        fn current_context(
            &self,
            _request: &Request,
        ) -> Result<Option<TraceContext>, TraceContextError> {
            Ok(self.0.map(TraceContext::new))
        }
    }

    struct FailingProvider;

    impl TraceContextProvider for FailingProvider {
        fn current_context(
            &self,
            _request: &Request,
        ) -> Result<Option<TraceContext>, TraceContextError> {
            Err(TraceContextError::Unavailable(anyhow::anyhow!(
                "tracer shut down"
            )))
        }
    }

    fn app(provider: SharedTraceContextProvider, calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        "ok"
                    }
                }),
            )
            .layer(from_fn_with_state(provider, trace_id_middleware))
    }

    async fn send(app: Router) -> Response {
        app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sets_header_from_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(StaticProvider(Some("4bf92f3577b34da6a3ce929d0e0e4736")));

        let response = send(app(provider, calls.clone())).await;

        assert_eq!(
            response.headers().get(TRACE_ID_HEADER).unwrap(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_header_without_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let response = send(app(Arc::new(StaticProvider(None)), calls.clone())).await;

        assert!(response.headers().get(TRACE_ID_HEADER).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_header_for_empty_trace_id() {
        let calls = Arc::new(AtomicUsize::new(0));
        let response = send(app(Arc::new(StaticProvider(Some(""))), calls.clone())).await;

        assert!(response.headers().get(TRACE_ID_HEADER).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_continues_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let response = send(app(Arc::new(FailingProvider), calls.clone())).await;

        assert_eq!(response.status(), 200);
        assert!(response.headers().get(TRACE_ID_HEADER).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_header_value_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let response = send(app(
            Arc::new(StaticProvider(Some("bad\nvalue"))),
            calls.clone(),
        ))
        .await;

        assert!(response.headers().get(TRACE_ID_HEADER).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_annotating_twice_keeps_single_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: SharedTraceContextProvider = Arc::new(StaticProvider(Some("abc123")));
        let app = app(provider.clone(), calls.clone())
            .layer(from_fn_with_state(provider, trace_id_middleware));

        let response = send(app).await;

        let values: Vec<_> = response.headers().get_all(TRACE_ID_HEADER).iter().collect();
        assert_eq!(values, vec!["abc123"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_downstream_header_is_kept() {
        let provider: SharedTraceContextProvider = Arc::new(StaticProvider(Some("abc123")));
        let app = Router::new()
            .route("/", get(|| async { ([(TRACE_ID_HEADER, "from-handler")], "ok") }))
            .layer(from_fn_with_state(provider, trace_id_middleware));

        let response = send(app).await;

        assert_eq!(
            response.headers().get(TRACE_ID_HEADER).unwrap(),
            "from-handler"
        );
    }
}

use crate::config::StarterConfig;
use crate::error::StarterError;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: env filter, JSON fmt output and an
/// OpenTelemetry layer so every request span carries a trace id.
///
/// Fails without touching the global tracer provider when a subscriber is
/// already installed.
pub fn init_tracing(config: &StarterConfig) -> Result<(), StarterError> {
    if tracing::dispatcher::has_been_set() {
        return Err(StarterError::TracingInit(anyhow::anyhow!(
            "global tracing subscriber already installed"
        )));
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let (tracer, local_provider) = build_tracer(config)?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true),
        )
        .try_init()?;

    if let Some(provider) = local_provider {
        opentelemetry::global::set_tracer_provider(provider);
    }

    Ok(())
}

/// The OTLP pipeline registers its provider globally itself; the local
/// provider is handed back for the caller to register.
fn build_tracer(
    config: &StarterConfig,
) -> Result<(sdktrace::Tracer, Option<sdktrace::TracerProvider>), StarterError> {
    let trace_config = sdktrace::config().with_resource(Resource::new(vec![KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]));

    match &config.otlp_endpoint {
        Some(endpoint) => {
            let otlp_exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(otlp_exporter)
                .with_trace_config(trace_config)
                .install_batch(runtime::Tokio)?;

            Ok((tracer, None))
        }
        None => {
            // No collector: ids are still generated so X-Trace-Id is emitted.
            let provider = sdktrace::TracerProvider::builder()
                .with_config(trace_config)
                .build();
            let tracer = provider.tracer(config.service_name.clone());

            Ok((tracer, Some(provider)))
        }
    }
}

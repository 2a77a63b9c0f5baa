use crate::error::StarterError;
use crate::observability::trace_context::TraceContextSource;
use config::{Config as Cfg, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StarterConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP/gRPC collector endpoint. Spans stay local when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub task_propagation: TaskPropagationConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub request_span: RequestSpanConfig,
    #[serde(default)]
    pub trace_id: TraceIdFilterConfig,
    #[serde(default)]
    pub header_logger: HeaderLoggerConfig,
}

/// Per-request `http_request` span continuing the inbound W3C trace.
#[derive(Debug, Deserialize, Clone)]
pub struct RequestSpanConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TraceIdFilterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub source: TraceContextSource,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeaderLoggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub redacted_headers: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaskPropagationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RequestSpanConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for TraceIdFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: TraceContextSource::default(),
        }
    }
}

impl Default for HeaderLoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redacted_headers: Vec::new(),
        }
    }
}

impl Default for TaskPropagationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
            filters: FilterConfig::default(),
            task_propagation: TaskPropagationConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "web-trace-starter".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl StarterConfig {
    /// Loads `.env`, an optional `configuration.*` file and `APP__`-style
    /// environment overrides, in that order of precedence (lowest first).
    pub fn load() -> Result<Self, StarterError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("filters.header_logger.redacted_headers")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, StarterError> {
        let config = Cfg::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

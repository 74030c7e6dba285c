use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    #[default]
    Pretty,
    /// Compact text format
    Compact,
    /// JSON format for log aggregation systems
    Json,
}

impl LogFormat {
    /// Parse log format from environment variable
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ => Self::default(),
        }
    }
}

/// Configuration for structured logging
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log output format (pretty/compact/json)
    pub format: LogFormat,
    /// Service name (e.g., "crowdwatch")
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Enable span events (enter/exit/close)
    pub enable_span_events: bool,
    /// Log to a daily-rotated file in addition to stdout
    pub log_dir: Option<String>,
}

impl LogConfig {
    /// Create a new log configuration with sensible defaults
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            format: LogFormat::from_env(),
            service_name: service_name.into(),
            service_version: env::var("SERVICE_VERSION").unwrap_or_else(|_| "0.1.0".to_string()),
            enable_span_events: env::var("LOG_SPAN_EVENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: env::var("LOG_DIR").ok(),
        }
    }

    /// Set the log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Enable logging to a daily-rotated file
    pub fn with_file_logging(mut self, log_dir: impl Into<String>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }
}

/// Initialize structured logging with the given configuration
pub fn init_structured_logging(config: LogConfig) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in ["hyper=warn", "tokio=warn", "lettre=warn"] {
        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }

    let span_events = if config.enable_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter);

    let file_layer = config.log_dir.as_ref().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, "crowdwatch.log");
        fmt::layer().json().with_writer(appender)
    });

    let init_result = match config.format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_target(true)
                .with_writer(io::stdout)
                .boxed();
            registry.with(json_layer).with(file_layer).try_init()
        }
        LogFormat::Compact => {
            let compact_layer = fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_target(true)
                .with_thread_ids(false)
                .boxed();
            registry.with(compact_layer).with(file_layer).try_init()
        }
        LogFormat::Pretty => {
            let pretty_layer = fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .boxed();
            registry.with(pretty_layer).with(file_layer).try_init()
        }
    };

    if init_result.is_ok() {
        tracing::info!(
            service.name = %config.service_name,
            service.version = %config.service_version,
            format = ?config.format,
            "structured logging initialized"
        );
    }
}

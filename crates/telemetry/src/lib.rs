use tracing_subscriber::{fmt, EnvFilter};

pub mod logging;
pub mod metrics;

pub use logging::{init_structured_logging, LogConfig, LogFormat};

/// Minimal init for tests and small tools.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Initialize structured logging with a service name and env-driven format.
pub fn init_with_service(service_name: impl Into<String>) {
    init_structured_logging(LogConfig::new(service_name));
}

//! Alerting pipeline: stateful alert decisions with per-kind cooldowns,
//! multi-channel dispatch, rate-limited alert image capture, and the
//! day-rotated data sink.

pub mod capture;
pub mod config;
pub mod engine;
pub mod notify;
pub mod sink;
pub mod types;

pub use config::{AlertConfig, EmailConfig, LogSinkConfig, RecordFormat};
pub use engine::AlertEngine;
pub use notify::NotificationChannel;
pub use types::{AlertLevel, AlertResult, AlertTrigger};

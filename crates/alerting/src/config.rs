use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SMTP settings for the email notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    pub username: String,
    pub password: String,
    pub from_address: String,
    pub recipients: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Master switch for the whole alert engine
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Print an alert banner to the console on trigger
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Emit a sound cue on trigger
    #[serde(default)]
    pub sound_alerts: bool,

    /// Send email notifications on trigger (requires `email`)
    #[serde(default)]
    pub email_notifications: bool,

    #[serde(default)]
    pub email: Option<EmailConfig>,

    /// Minimum seconds between two alerts of the same kind
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: f64,
}

fn default_true() -> bool {
    true
}

fn default_cooldown() -> f64 {
    60.0
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console_output: true,
            sound_alerts: false,
            email_notifications: false,
            email: None,
            cooldown_seconds: 60.0,
        }
    }
}

/// Persisted record format for the data sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    #[default]
    Csv,
    Json,
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFormat::Csv => write!(f, "csv"),
            RecordFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSinkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub format: RecordFormat,

    /// Directory for log artifacts; alert images go to `<directory>/images`
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Minimum seconds between two persisted records
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: f64,

    /// Save an alert frame image while an alert is active
    #[serde(default)]
    pub save_images: bool,

    /// Minimum seconds between two saved alert images
    #[serde(default = "default_image_interval")]
    pub image_interval_seconds: f64,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_interval() -> f64 {
    5.0
}

fn default_image_interval() -> f64 {
    30.0
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: RecordFormat::Csv,
            directory: default_log_directory(),
            log_interval_seconds: 5.0,
            save_images: false,
            image_interval_seconds: 30.0,
        }
    }
}

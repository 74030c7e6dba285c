use chrono::{DateTime, Utc};
use common::analysis::CrowdLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Cooldown key: one of the crowd-level names or the anomaly kind. Each
/// kind tracks its own last-trigger time; kinds never share cooldown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Level(CrowdLevel),
    Anomaly,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Level(level) => write!(f, "{}", level),
            AlertKind::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// What caused an alert to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertTrigger {
    Threshold,
    Anomaly,
    #[default]
    None,
}

impl std::fmt::Display for AlertTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertTrigger::Threshold => write!(f, "threshold"),
            AlertTrigger::Anomaly => write!(f, "anomaly"),
            AlertTrigger::None => write!(f, "none"),
        }
    }
}

/// Alert severity as reported in results and log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
    Anomaly,
}

impl From<CrowdLevel> for AlertLevel {
    fn from(level: CrowdLevel) -> Self {
        match level {
            CrowdLevel::Low => AlertLevel::Low,
            CrowdLevel::Medium => AlertLevel::Medium,
            CrowdLevel::High => AlertLevel::High,
            CrowdLevel::Critical => AlertLevel::Critical,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::None => write!(f, "none"),
            AlertLevel::Low => write!(f, "low"),
            AlertLevel::Medium => write!(f, "medium"),
            AlertLevel::High => write!(f, "high"),
            AlertLevel::Critical => write!(f, "critical"),
            AlertLevel::Anomaly => write!(f, "anomaly"),
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AlertLevel::None),
            "low" => Ok(AlertLevel::Low),
            "medium" => Ok(AlertLevel::Medium),
            "high" => Ok(AlertLevel::High),
            "critical" => Ok(AlertLevel::Critical),
            "anomaly" => Ok(AlertLevel::Anomaly),
            _ => Err(format!("Invalid alert level: {}", s)),
        }
    }
}

/// Outcome of one alert evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertResult {
    pub triggered: bool,
    pub level: AlertLevel,
    pub alert_type: AlertTrigger,
    pub message: String,
    /// Dispatch record: which channels ran and whether they succeeded,
    /// e.g. "console_output", "email_sent", "email_failed", "sound_alert".
    pub actions_taken: Vec<String>,
    pub event_id: Option<Uuid>,
}

impl AlertResult {
    pub fn none() -> Self {
        Self {
            triggered: false,
            level: AlertLevel::None,
            alert_type: AlertTrigger::None,
            message: String::new(),
            actions_taken: Vec::new(),
            event_id: None,
        }
    }
}

impl Default for AlertResult {
    fn default() -> Self {
        Self::none()
    }
}

/// Snapshot of the alert engine's state, for operators and tests.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEngineStats {
    pub current_level: AlertLevel,
    pub cooldown_seconds: f64,
    pub last_alert_times: HashMap<String, DateTime<Utc>>,
    pub channels: Vec<String>,
}

use alerting::{AlertConfig, LogSinkConfig};
use analytics::AnalyticsConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bounded frame queue capacity; newest frames are dropped when full
    #[serde(default = "default_queue_capacity")]
    pub frame_queue_capacity: usize,

    /// Consumer-side frame wait; a timeout means "try again", not an error
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    10
}

fn default_frame_timeout_ms() -> u64 {
    1000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_queue_capacity: 10,
            frame_timeout_ms: 1000,
        }
    }
}

/// Aggregate configuration for one session, immutable after construction.
/// Passed by reference into each component's constructor; there is no
/// global config state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrowdwatchConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub logging: LogSinkConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl CrowdwatchConfig {
    /// Build from a JSON value; missing sections and fields fall back to
    /// defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).context("invalid crowdwatch configuration")
    }
}

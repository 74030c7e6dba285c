//! Per-frame crowd analysis contracts.
//!
//! These types are produced by the analytics core and consumed by the alert
//! engine, the data sink, and session callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete crowd severity bucket derived from the smoothed count.
/// Ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CrowdLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl CrowdLevel {
    /// Levels that qualify for a threshold alert.
    pub fn is_alertable(&self) -> bool {
        matches!(self, CrowdLevel::High | CrowdLevel::Critical)
    }
}

impl std::fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrowdLevel::Low => write!(f, "low"),
            CrowdLevel::Medium => write!(f, "medium"),
            CrowdLevel::High => write!(f, "high"),
            CrowdLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for CrowdLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(CrowdLevel::Low),
            "medium" => Ok(CrowdLevel::Medium),
            "high" => Ok(CrowdLevel::High),
            "critical" => Ok(CrowdLevel::Critical),
            _ => Err(format!("Invalid crowd level: {}", s)),
        }
    }
}

/// Direction label for a metric's recent rate of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Rate-of-change summary over the recent history window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TrendReport {
    pub count_trend: Trend,
    pub count_rate: f64,
    pub density_trend: Trend,
    pub density_rate: f64,
}

/// Statistical anomaly flags for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnomalyReport {
    pub count_anomaly: bool,
    pub density_anomaly: bool,
    pub sudden_change: bool,
}

impl AnomalyReport {
    pub fn any(&self) -> bool {
        self.count_anomaly || self.density_anomaly || self.sudden_change
    }

    /// Human-readable labels of the raised flags, for alert messages.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.count_anomaly {
            labels.push("count anomaly");
        }
        if self.density_anomaly {
            labels.push("density anomaly");
        }
        if self.sudden_change {
            labels.push("sudden change");
        }
        labels
    }
}

/// Spatial distribution summary of the detections in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SpatialSummary {
    /// Mean of box centers, pixels.
    pub center_of_mass: (f64, f64),
    /// Mean per-axis standard deviation of centers.
    pub spread: f64,
    /// 1 - normalized mean pairwise distance; higher = tighter packing.
    pub clustering_score: f64,
    /// Fraction of centers within 10% of frame size from any edge.
    pub edge_density: f64,
}

/// Full analysis output for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp: DateTime<Utc>,
    pub person_count: usize,
    pub smoothed_count: f64,
    pub density_score: f64,
    pub smoothed_density: f64,
    pub crowd_level: CrowdLevel,
    pub density_heatmap: Vec<Vec<f64>>,
    pub spatial: SpatialSummary,
    pub trends: TrendReport,
    pub anomalies: AnomalyReport,
}

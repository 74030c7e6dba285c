use serde::{Deserialize, Serialize};

/// How the per-frame density score is computed. The two methods are not
/// numerically comparable; pick one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DensityMethod {
    /// Fraction of frame pixels covered by at least one box.
    #[default]
    BboxCoverage,
    /// Inverted mean nearest-neighbour distance between box centers.
    SpatialDistribution,
}

/// Ordered count thresholds mapping a smoothed count to a crowd level.
///
/// Expected ordering is `low < medium < high`; a degenerate ordering is
/// tolerated (classification falls through the comparisons) but construction
/// via [`AnalyticsConfig::validated`] replaces it with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ThresholdConfig {
    pub fn is_ordered(&self) -> bool {
        self.low < self.medium && self.medium < self.high
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            low: 20.0,
            medium: 50.0,
            high: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Density calculation method
    #[serde(default)]
    pub density_calculation: DensityMethod,

    /// Exponential moving average factor, (0, 1]
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f64,

    /// Heatmap grid size as (rows, cols)
    #[serde(default = "default_grid_size")]
    pub density_grid_size: (usize, usize),

    /// Count thresholds for crowd level classification
    #[serde(default)]
    pub alert_thresholds: ThresholdConfig,

    /// Ring buffer capacity for count/density/timestamp history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_smoothing_factor() -> f64 {
    0.3
}

fn default_grid_size() -> (usize, usize) {
    (10, 10)
}

fn default_history_capacity() -> usize {
    100
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            density_calculation: DensityMethod::BboxCoverage,
            smoothing_factor: 0.3,
            density_grid_size: (10, 10),
            alert_thresholds: ThresholdConfig::default(),
            history_capacity: 100,
        }
    }
}

impl AnalyticsConfig {
    /// Best-effort repair of caller-supplied values: malformed entries are
    /// replaced with defaults and a warning is logged, never an error.
    pub fn validated(mut self) -> Self {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            tracing::warn!(
                smoothing_factor = self.smoothing_factor,
                "smoothing factor outside (0, 1], falling back to default"
            );
            self.smoothing_factor = default_smoothing_factor();
        }
        if !self.alert_thresholds.is_ordered() {
            tracing::warn!(
                thresholds = ?self.alert_thresholds,
                "alert thresholds not strictly ordered, falling back to defaults"
            );
            self.alert_thresholds = ThresholdConfig::default();
        }
        let (rows, cols) = self.density_grid_size;
        if rows == 0 || cols == 0 {
            tracing::warn!(rows, cols, "empty heatmap grid, falling back to default");
            self.density_grid_size = default_grid_size();
        }
        if self.history_capacity < 2 {
            tracing::warn!(
                capacity = self.history_capacity,
                "history capacity too small, falling back to default"
            );
            self.history_capacity = default_history_capacity();
        }
        self
    }
}

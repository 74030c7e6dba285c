//! Count-to-severity classification.

use common::analysis::CrowdLevel;

use crate::config::ThresholdConfig;

/// Map a (typically smoothed) count onto a crowd level via the ordered
/// half-open intervals of the thresholds. Pure; tolerates degenerate
/// orderings by falling through the comparisons in order.
pub fn classify(count: f64, thresholds: &ThresholdConfig) -> CrowdLevel {
    if count < thresholds.low {
        CrowdLevel::Low
    } else if count < thresholds.medium {
        CrowdLevel::Medium
    } else if count < thresholds.high {
        CrowdLevel::High
    } else {
        CrowdLevel::Critical
    }
}

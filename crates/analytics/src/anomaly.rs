//! Statistical anomaly detection against the recent history window.

use common::analysis::AnomalyReport;

use crate::history::HistoryStore;
use crate::stats;

/// Samples needed before any flag can raise; also the statistics window.
const ANOMALY_WINDOW: usize = 20;

/// Z-score above which a reading is an outlier.
const Z_SCORE_THRESHOLD: f64 = 2.0;

/// Absolute floor for the frame-to-frame jump threshold.
const JUMP_MIN_PEOPLE: f64 = 10.0;

/// Relative jump threshold as a fraction of the window mean.
const JUMP_MEAN_FRACTION: f64 = 0.3;

/// Flag outliers and sudden changes for the current frame. All flags stay
/// false until the history holds [`ANOMALY_WINDOW`] samples, regardless of
/// how extreme the inputs are.
pub fn detect(current_count: f64, current_density: f64, history: &HistoryStore) -> AnomalyReport {
    let mut report = AnomalyReport::default();

    if history.len() < ANOMALY_WINDOW {
        return report;
    }

    let counts = history.tail_counts(ANOMALY_WINDOW);
    let densities = history.tail_densities(ANOMALY_WINDOW);

    let count_mean = stats::mean(&counts);
    let count_std = stats::std_dev(&counts);
    let density_mean = stats::mean(&densities);
    let density_std = stats::std_dev(&densities);

    if count_std > 0.0 && (current_count - count_mean).abs() / count_std > Z_SCORE_THRESHOLD {
        report.count_anomaly = true;
    }

    if density_std > 0.0
        && (current_density - density_mean).abs() / density_std > Z_SCORE_THRESHOLD
    {
        report.density_anomaly = true;
    }

    // Absolute-or-relative jump threshold so both small and large crowds
    // register sudden changes.
    if let Some(previous) = history.previous_count() {
        let jump = (current_count - previous).abs();
        if jump > JUMP_MIN_PEOPLE.max(count_mean * JUMP_MEAN_FRACTION) {
            report.sudden_change = true;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_history(samples: usize, count: f64) -> HistoryStore {
        let mut history = HistoryStore::new(100);
        for i in 0..samples {
            // Small alternation so the std deviation is non-zero.
            let wobble = if i % 2 == 0 { 0.5 } else { -0.5 };
            history.push(count + wobble, 0.3 + wobble / 100.0, 1000.0 + i as f64);
        }
        history
    }

    #[test]
    fn test_all_false_below_minimum_history() {
        let history = steady_history(19, 10.0);
        let report = detect(1000.0, 1.0, &history);
        assert!(!report.count_anomaly);
        assert!(!report.density_anomaly);
        assert!(!report.sudden_change);
    }

    #[test]
    fn test_count_outlier_flags() {
        let mut history = steady_history(20, 10.0);
        history.push(50.0, 0.3, 1100.0);
        let report = detect(50.0, 0.3, &history);
        assert!(report.count_anomaly);
    }

    #[test]
    fn test_density_outlier_flags() {
        let mut history = steady_history(20, 10.0);
        history.push(10.0, 0.95, 1100.0);
        let report = detect(10.0, 0.95, &history);
        assert!(report.density_anomaly);
        assert!(!report.count_anomaly);
    }

    #[test]
    fn test_zero_variance_never_flags_outliers() {
        let mut history = HistoryStore::new(100);
        for i in 0..25 {
            history.push(10.0, 0.3, 1000.0 + i as f64);
        }
        let report = detect(500.0, 0.99, &history);
        assert!(!report.count_anomaly);
        assert!(!report.density_anomaly);
    }

    #[test]
    fn test_sudden_change_absolute_jump() {
        // Small crowd: mean ~10, so the absolute floor of 10 governs.
        let mut history = steady_history(20, 10.0);
        history.push(25.0, 0.3, 1100.0);
        let report = detect(25.0, 0.3, &history);
        assert!(report.sudden_change);
    }

    #[test]
    fn test_sudden_change_relative_jump() {
        // Large crowd: mean ~100, so the 30% relative threshold governs.
        let mut history = steady_history(20, 100.0);
        history.push(120.0, 0.3, 1100.0);
        let below = detect(120.0, 0.3, &history);
        assert!(!below.sudden_change);

        history.push(160.0, 0.3, 1101.0);
        let above = detect(160.0, 0.3, &history);
        assert!(above.sudden_change);
    }
}

//! Trend estimation over the recent history window.

use common::analysis::{Trend, TrendReport};

use crate::history::HistoryStore;
use crate::stats;

/// Samples used for the regression.
const TREND_WINDOW: usize = 10;

/// Rate cutoff for the increasing/decreasing labels. Applied in raw units
/// to both count (people/sec) and density (fraction/sec); the shared
/// constant is an inherited calibration, keep them aligned.
const RATE_CUTOFF: f64 = 0.5;

/// Classify count and density trends over the most recent window. With
/// fewer than [`TREND_WINDOW`] samples both metrics report stable / 0.0.
pub fn classify_trends(history: &HistoryStore) -> TrendReport {
    if history.len() < TREND_WINDOW {
        return TrendReport::default();
    }

    let counts = history.tail_counts(TREND_WINDOW);
    let densities = history.tail_densities(TREND_WINDOW);
    let times = history.tail_timestamps(TREND_WINDOW);

    let count_rate = rate_of_change(&counts, &times);
    let density_rate = rate_of_change(&densities, &times);

    TrendReport {
        count_trend: label(count_rate),
        count_rate,
        density_trend: label(density_rate),
        density_rate,
    }
}

/// Correlation-scaled regression slope: `corr(x, y) * std(y) / std(x)` with
/// x as time since the first sample. 0.0 when the timestamps carry no
/// variance or there are fewer than two points.
fn rate_of_change(values: &[f64], times: &[f64]) -> f64 {
    if values.len() < 2 || times.len() != values.len() {
        return 0.0;
    }

    let t0 = times[0];
    let xs: Vec<f64> = times.iter().map(|t| t - t0).collect();

    let sx = stats::std_dev(&xs);
    let sy = stats::std_dev(values);
    if sx == 0.0 || sy == 0.0 {
        return 0.0;
    }

    stats::correlation(&xs, values) * (sy / sx)
}

fn label(rate: f64) -> Trend {
    if rate > RATE_CUTOFF {
        Trend::Increasing
    } else if rate < -RATE_CUTOFF {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

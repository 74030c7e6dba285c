//! Per-frame orchestration of the analytics engines.

use chrono::{DateTime, Utc};
use common::analysis::AnalysisResult;
use common::detections::FrameDetections;
use serde::Serialize;

use crate::anomaly;
use crate::classify;
use crate::config::AnalyticsConfig;
use crate::density::DensityEngine;
use crate::history::{HistorySummary, HistoryStore};
use crate::smoothing::Smoother;
use crate::trend;

/// Runs the full analysis once per frame and owns all per-session state
/// (history, smoothing, last-seen frame dimensions). One instance per
/// video-stream session; never shared across sessions.
pub struct CrowdAnalyzer {
    config: AnalyticsConfig,
    density: DensityEngine,
    history: HistoryStore,
    smoother: Smoother,
    frame_dims: Option<(u32, u32)>,
}

impl CrowdAnalyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        let config = config.validated();
        let density = DensityEngine::new(config.density_calculation, config.density_grid_size);
        let history = HistoryStore::new(config.history_capacity);
        let smoother = Smoother::new(config.smoothing_factor);
        Self {
            config,
            density,
            history,
            smoother,
            frame_dims: None,
        }
    }

    /// Latest known frame dimensions, if any frame carried them yet.
    pub fn frame_dims(&self) -> Option<(u32, u32)> {
        self.frame_dims
    }

    /// Analyze one frame's detections. `dims` updates the remembered frame
    /// dimensions when present; analysis degrades to zero-valued spatial
    /// metrics while they are unknown.
    pub fn analyze(
        &mut self,
        detections: &FrameDetections,
        dims: Option<(u32, u32)>,
        now: DateTime<Utc>,
    ) -> AnalysisResult {
        let start = std::time::Instant::now();

        if dims.is_some() {
            self.frame_dims = dims;
        }

        let person_count = detections.person_count;
        let density_score = self
            .density
            .density_score(&detections.boxes, self.frame_dims);

        let ts_secs = now.timestamp_millis() as f64 / 1000.0;
        self.history
            .push(person_count as f64, density_score, ts_secs);

        let smoothed = self.smoother.update(person_count as f64, density_score);

        let density_heatmap = self.density.heatmap(&detections.boxes, self.frame_dims);
        let spatial = self
            .density
            .spatial_summary(&detections.boxes, self.frame_dims);

        let crowd_level = classify::classify(smoothed.count, &self.config.alert_thresholds);
        let trends = trend::classify_trends(&self.history);
        let anomalies = anomaly::detect(person_count as f64, density_score, &self.history);

        telemetry::metrics::ANALYSIS_LATENCY.observe(start.elapsed().as_secs_f64());

        AnalysisResult {
            timestamp: now,
            person_count,
            smoothed_count: smoothed.count,
            density_score,
            smoothed_density: smoothed.density,
            crowd_level,
            density_heatmap,
            spatial,
            trends,
            anomalies,
        }
    }

    /// Aggregate session statistics over the retained history.
    pub fn statistics(&self) -> AnalyzerStats {
        let smoothed = self.smoother.current();
        AnalyzerStats {
            history: self.history.summary(),
            smoothed_count: smoothed.map(|s| s.count).unwrap_or(0.0),
            smoothed_density: smoothed.map(|s| s.density).unwrap_or(0.0),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnalyzerStats {
    pub history: HistorySummary,
    pub smoothed_count: f64,
    pub smoothed_density: f64,
}

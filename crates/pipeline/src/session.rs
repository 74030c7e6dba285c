//! Per-session processing loop.

use alerting::capture::AlertImageWriter;
use alerting::engine::AlertEngine;
use alerting::notify::NotificationChannel;
use alerting::sink::DataSink;
use analytics::analyzer::AnalyzerStats;
use analytics::CrowdAnalyzer;
use anyhow::Result;
use chrono::Utc;
use common::detections::{sanitize_detections, Frame};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::CrowdwatchConfig;
use crate::detector::Detector;
use crate::source::{frame_queue, FrameRead, FrameSender, FrameSource};

/// Rolling window for the per-frame processing time average.
const PROCESSING_TIME_WINDOW: usize = 100;

/// Progress log cadence, in frames.
const PROGRESS_LOG_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub alerts_fired: u64,
    pub records_written: u64,
    pub elapsed_seconds: f64,
    pub avg_fps: f64,
    pub avg_processing_ms: f64,
}

/// One video-stream session: frame acquisition feeds a bounded queue, and
/// every dequeued frame runs end-to-end through detection, analysis, alert
/// evaluation, capture, and logging before the next frame starts. All
/// mutable state (history, smoothing, cooldowns) lives here and is touched
/// strictly sequentially.
pub struct CrowdSession {
    config: CrowdwatchConfig,
    analyzer: CrowdAnalyzer,
    alerts: AlertEngine,
    sink: DataSink,
    capture: AlertImageWriter,
    processing_times: VecDeque<f64>,
    frames_processed: u64,
    alerts_fired: u64,
}

impl CrowdSession {
    pub fn new(config: CrowdwatchConfig) -> Self {
        let analyzer = CrowdAnalyzer::new(config.analytics.clone());
        let alerts = AlertEngine::new(config.alerts.clone());
        let sink = DataSink::new(config.logging.clone());
        let capture = AlertImageWriter::new(&config.logging);
        Self {
            config,
            analyzer,
            alerts,
            sink,
            capture,
            processing_times: VecDeque::with_capacity(PROCESSING_TIME_WINDOW),
            frames_processed: 0,
            alerts_fired: 0,
        }
    }

    /// Register an extra notification channel before the run starts.
    pub fn add_notification_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.alerts.add_channel(channel);
    }

    pub fn analyzer_statistics(&self) -> AnalyzerStats {
        self.analyzer.statistics()
    }

    /// Drive the session until the source ends or the token is cancelled.
    /// Cancellation takes effect at a frame boundary; the log artifact is
    /// closed and the acquisition task joined before returning.
    pub async fn run(
        &mut self,
        source: Box<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        cancel: CancellationToken,
    ) -> Result<SessionStats> {
        let started = Instant::now();
        let timeout = Duration::from_millis(self.config.pipeline.frame_timeout_ms);

        let (tx, mut queue) = frame_queue(self.config.pipeline.frame_queue_capacity);
        let producer = tokio::spawn(acquisition_loop(source, tx, cancel.clone()));

        info!(
            detector = detector.name(),
            queue_capacity = self.config.pipeline.frame_queue_capacity,
            "session started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("session cancelled, stopping at frame boundary");
                    break;
                }
                read = queue.recv(timeout) => match read {
                    FrameRead::TimedOut => continue,
                    FrameRead::Ended => {
                        info!("frame stream ended");
                        break;
                    }
                    FrameRead::Frame(frame) => {
                        self.process_frame(&frame, detector.as_ref()).await;
                    }
                },
            }
        }

        if let Err(e) = producer.await {
            warn!(error = %e, "frame acquisition task panicked");
        }
        self.sink.close();

        let stats = self.stats(queue.dropped(), started.elapsed().as_secs_f64());
        info!(
            frames = stats.frames_processed,
            dropped = stats.frames_dropped,
            alerts = stats.alerts_fired,
            records = stats.records_written,
            avg_fps = format!("{:.2}", stats.avg_fps),
            "session complete"
        );

        Ok(stats)
    }

    async fn process_frame(&mut self, frame: &Frame, detector: &dyn Detector) {
        let frame_start = Instant::now();
        let now = Utc::now();

        let detections = match detector.detect(frame).await {
            Ok(raw) => sanitize_detections(raw),
            Err(e) => {
                telemetry::metrics::FRAMES_PROCESSED
                    .with_label_values(&["detector_error"])
                    .inc();
                warn!(
                    error = %e,
                    sequence = frame.sequence,
                    "detector failed, skipping frame"
                );
                return;
            }
        };

        let analysis = self.analyzer.analyze(&detections, Some(frame.dims()), now);
        let mut alert = self.alerts.evaluate(&analysis, now).await;

        if alert.triggered {
            self.alerts_fired += 1;
            if let Some(action) = self.capture.save_if_due(frame, &alert, now) {
                alert.actions_taken.push(action.to_string());
            }
        }

        self.sink.log_if_due(&analysis, &alert, now);

        telemetry::metrics::FRAMES_PROCESSED
            .with_label_values(&["ok"])
            .inc();
        self.frames_processed += 1;

        self.processing_times
            .push_back(frame_start.elapsed().as_secs_f64() * 1000.0);
        while self.processing_times.len() > PROCESSING_TIME_WINDOW {
            self.processing_times.pop_front();
        }

        if self.frames_processed % PROGRESS_LOG_EVERY == 0 {
            info!(
                frames = self.frames_processed,
                level = %analysis.crowd_level,
                "processed frames"
            );
        }
    }

    fn stats(&self, frames_dropped: u64, elapsed_seconds: f64) -> SessionStats {
        let avg_processing_ms = if self.processing_times.is_empty() {
            0.0
        } else {
            self.processing_times.iter().sum::<f64>() / self.processing_times.len() as f64
        };
        SessionStats {
            frames_processed: self.frames_processed,
            frames_dropped,
            alerts_fired: self.alerts_fired,
            records_written: self.sink.records_written(),
            elapsed_seconds,
            avg_fps: if elapsed_seconds > 0.0 {
                self.frames_processed as f64 / elapsed_seconds
            } else {
                0.0
            },
            avg_processing_ms,
        }
    }
}

async fn acquisition_loop(
    mut source: Box<dyn FrameSource>,
    tx: FrameSender,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("frame acquisition cancelled");
                break;
            }
            next = source.next_frame() => match next {
                Ok(Some(frame)) => {
                    tx.offer(frame);
                }
                Ok(None) => {
                    info!("frame source reached end of stream");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read frame, stopping acquisition");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::MockDetector;
    use crate::source::SyntheticSource;
    use analytics::ThresholdConfig;

    fn test_config(dir: &std::path::Path) -> CrowdwatchConfig {
        let mut config = CrowdwatchConfig::default();
        config.logging.directory = dir.to_path_buf();
        config.logging.log_interval_seconds = 0.0;
        config.alerts.console_output = false;
        // Wide enough that an unpaced synthetic source never overflows it;
        // exact frame counts below depend on nothing being dropped.
        config.pipeline.frame_queue_capacity = 64;
        config
    }

    #[tokio::test]
    async fn test_session_runs_to_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CrowdSession::new(test_config(dir.path()));

        let source = Box::new(SyntheticSource::new(64, 48, 12));
        let detector = Arc::new(MockDetector::scripted(vec![3]));

        let stats = session
            .run(source, detector, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.frames_processed, 12);
        assert_eq!(stats.records_written, 12);
        assert!(stats.avg_processing_ms >= 0.0);

        let analyzer_stats = session.analyzer_statistics();
        assert_eq!(analyzer_stats.history.samples, 12);
        assert_eq!(analyzer_stats.history.current_count, 3.0);
    }

    #[tokio::test]
    async fn test_session_fires_threshold_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.analytics.alert_thresholds = ThresholdConfig {
            low: 1.0,
            medium: 2.0,
            high: 3.0,
        };
        config.analytics.smoothing_factor = 1.0;
        config.alerts.cooldown_seconds = 0.0;

        let mut session = CrowdSession::new(config);
        let source = Box::new(SyntheticSource::new(64, 48, 5));
        let detector = Arc::new(MockDetector::scripted(vec![6]));

        let stats = session
            .run(source, detector, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.frames_processed, 5);
        assert_eq!(stats.alerts_fired, 5);
    }

    #[tokio::test]
    async fn test_cancellation_stops_an_endless_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CrowdSession::new(test_config(dir.path()));

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        });

        let source = Box::new(SyntheticSource::new(64, 48, u64::MAX).with_fps(500.0));
        let detector = Arc::new(MockDetector::new());

        let stats = session.run(source, detector, cancel).await.unwrap();
        assert!(stats.frames_processed > 0);
    }
}

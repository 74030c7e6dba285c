//! End-to-end session runs against synthetic capabilities.

use alerting::notify::RecordingChannel;
use analytics::ThresholdConfig;
use common::analysis::CrowdLevel;
use pipeline::{CrowdSession, CrowdwatchConfig, MockDetector, SyntheticSource};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn base_config(dir: &std::path::Path) -> CrowdwatchConfig {
    let mut config = CrowdwatchConfig::default();
    config.logging.directory = dir.to_path_buf();
    config.logging.log_interval_seconds = 0.0;
    config.alerts.console_output = false;
    // Wide enough that an unpaced synthetic source never overflows it;
    // the exact frame counts asserted below depend on zero drops.
    config.pipeline.frame_queue_capacity = 64;
    config
}

#[tokio::test]
async fn synthetic_ramp_produces_alerts_and_log_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.analytics.alert_thresholds = ThresholdConfig {
        low: 2.0,
        medium: 4.0,
        high: 6.0,
    };
    config.alerts.cooldown_seconds = 0.0;

    let mut session = CrowdSession::new(config);
    let channel = Arc::new(RecordingChannel::new());
    session.add_notification_channel(channel.clone());

    // Ramp from quiet to well past the high threshold; with alpha = 0.3 the
    // smoothed count crosses 6.0 a couple of frames after the raw count does.
    let script = vec![1, 1, 2, 3, 5, 8, 9, 9, 9, 9];
    let detector = Arc::new(MockDetector::scripted(script.clone()));
    let source = Box::new(SyntheticSource::new(64, 48, script.len() as u64));

    let stats = session
        .run(source, detector, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.frames_processed, script.len() as u64);
    assert!(stats.alerts_fired >= 1);
    assert_eq!(stats.records_written, stats.frames_processed);
    assert!(!channel.sent().is_empty());

    // One CSV artifact with a single header; parsed records reconstruct the
    // counts and include at least one high-or-worse crowd level.
    let csv_files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "csv"))
        .collect();
    assert_eq!(csv_files.len(), 1);

    let content = std::fs::read_to_string(csv_files[0].path()).unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().starts_with("timestamp,"));

    let mut high_seen = false;
    let mut records = 0usize;
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        let count: usize = fields[2].parse().unwrap();
        assert!(count <= 9);
        let level = CrowdLevel::from_str(fields[6]).unwrap();
        if level >= CrowdLevel::High {
            high_seen = true;
        }
        records += 1;
    }
    assert_eq!(records, script.len());
    assert!(high_seen);
}

#[tokio::test]
async fn empty_detections_run_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = CrowdSession::new(base_config(dir.path()));

    let detector = Arc::new(MockDetector::scripted(vec![0]));
    let source = Box::new(SyntheticSource::new(64, 48, 6));

    let stats = session
        .run(source, detector, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.frames_processed, 6);
    assert_eq!(stats.alerts_fired, 0);

    let analyzer_stats = session.analyzer_statistics();
    assert_eq!(analyzer_stats.history.current_count, 0.0);
    assert_eq!(analyzer_stats.smoothed_count, 0.0);
}

#[tokio::test]
async fn cancellation_closes_the_session_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    // Keep the artifact quiet; this test is about shutdown.
    config.logging.log_interval_seconds = 3600.0;

    let mut session = CrowdSession::new(config);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let detector = Arc::new(MockDetector::new());
    let source = Box::new(SyntheticSource::new(64, 48, u64::MAX).with_fps(500.0));

    let stats = session.run(source, detector, cancel).await.unwrap();
    assert!(stats.frames_processed > 0);
    assert!(stats.elapsed_seconds < 10.0);
}

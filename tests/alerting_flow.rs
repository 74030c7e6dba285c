//! Alert evaluation flowing into persisted records.

use alerting::engine::AlertEngine;
use alerting::sink::DataSink;
use alerting::{AlertConfig, AlertLevel, AlertTrigger, LogSinkConfig};
use chrono::{DateTime, TimeZone, Utc};
use common::analysis::{
    AnalysisResult, AnomalyReport, CrowdLevel, SpatialSummary, TrendReport,
};
use std::str::FromStr;

fn analysis(level: CrowdLevel, anomalies: AnomalyReport) -> AnalysisResult {
    AnalysisResult {
        timestamp: at(0),
        person_count: 110,
        smoothed_count: 105.5,
        density_score: 0.72,
        smoothed_density: 0.70,
        crowd_level: level,
        density_heatmap: vec![vec![0.0; 10]; 10],
        spatial: SpatialSummary::default(),
        trends: TrendReport::default(),
        anomalies,
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000 + secs, 0).single().unwrap()
}

fn quiet_engine() -> AlertEngine {
    AlertEngine::new(AlertConfig {
        console_output: false,
        ..AlertConfig::default()
    })
}

fn sink_in(dir: &std::path::Path) -> DataSink {
    DataSink::new(LogSinkConfig {
        directory: dir.to_path_buf(),
        log_interval_seconds: 0.0,
        ..LogSinkConfig::default()
    })
}

#[tokio::test]
async fn triggered_alert_level_lands_in_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = quiet_engine();
    let mut sink = sink_in(dir.path());

    let input = analysis(CrowdLevel::Critical, AnomalyReport::default());
    let alert = engine.evaluate(&input, at(0)).await;
    assert!(alert.triggered);
    assert_eq!(alert.alert_type, AlertTrigger::Threshold);
    assert!(alert.message.contains("105.5"));

    assert!(sink.log_if_due(&input, &alert, at(0)));

    let content = std::fs::read_to_string(sink.active_path(at(0))).unwrap();
    let record = content.lines().nth(1).unwrap();
    let fields: Vec<&str> = record.split(',').collect();
    assert_eq!(
        AlertLevel::from_str(fields[7]).unwrap(),
        AlertLevel::Critical
    );
}

#[tokio::test]
async fn suppressed_cycle_logs_level_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = quiet_engine();
    let mut sink = sink_in(dir.path());

    let input = analysis(CrowdLevel::High, AnomalyReport::default());
    let first = engine.evaluate(&input, at(0)).await;
    assert!(first.triggered);
    sink.log_if_due(&input, &first, at(0));

    // Within the 60s cooldown the same level stays quiet and the record
    // carries alert level none.
    let second = engine.evaluate(&input, at(20)).await;
    assert!(!second.triggered);
    sink.log_if_due(&input, &second, at(20));

    let content = std::fs::read_to_string(sink.active_path(at(20))).unwrap();
    let last = content.lines().last().unwrap();
    let fields: Vec<&str> = last.split(',').collect();
    assert_eq!(AlertLevel::from_str(fields[7]).unwrap(), AlertLevel::None);
}

#[tokio::test]
async fn anomaly_cooldown_survives_threshold_priority() {
    let mut engine = quiet_engine();
    let anomalies = AnomalyReport {
        sudden_change: true,
        ..AnomalyReport::default()
    };

    // Both candidates qualify: threshold wins.
    let first = engine
        .evaluate(&analysis(CrowdLevel::High, anomalies), at(0))
        .await;
    assert_eq!(first.alert_type, AlertTrigger::Threshold);

    // Next cycle the high level is cooling down but the anomaly, whose
    // cooldown was never stamped, fires.
    let second = engine
        .evaluate(&analysis(CrowdLevel::High, anomalies), at(1))
        .await;
    assert_eq!(second.alert_type, AlertTrigger::Anomaly);
    assert_eq!(second.level, AlertLevel::Anomaly);
}

#[tokio::test]
async fn records_rotate_across_calendar_days() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = quiet_engine();
    let mut sink = sink_in(dir.path());

    let input = analysis(CrowdLevel::Low, AnomalyReport::default());

    let before_midnight = Utc.with_ymd_and_hms(2026, 8, 6, 23, 58, 0).single().unwrap();
    let after_midnight = Utc.with_ymd_and_hms(2026, 8, 7, 0, 2, 0).single().unwrap();

    let quiet = engine.evaluate(&input, before_midnight).await;
    sink.log_if_due(&input, &quiet, before_midnight);
    sink.log_if_due(&input, &quiet, after_midnight);

    let first = sink.active_path(before_midnight);
    let second = sink.active_path(after_midnight);
    assert_ne!(first, second);

    for path in [first, second] {
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            content.lines().filter(|l| l.starts_with("timestamp,")).count(),
            1
        );
        assert_eq!(content.lines().count(), 2);
    }
}

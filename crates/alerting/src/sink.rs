//! Rate-limited, day-rotated persistence of analysis + alert records.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::analysis::AnalysisResult;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::{LogSinkConfig, RecordFormat};
use crate::types::AlertResult;

/// Column order is the compatibility surface of the CSV artifact; keep it
/// stable.
const CSV_HEADER: &str = "timestamp,datetime,person_count,smoothed_count,density_score,\
smoothed_density,crowd_level,alert_level,center_of_mass_x,center_of_mass_y,spread,\
clustering_score,edge_density,count_trend,density_trend,anomalies";

/// Append-only structured log of analysis results and alert levels.
///
/// Records are written at most once per `log_interval_seconds`; the artifact
/// is keyed by the UTC calendar day and rotates automatically when the day
/// changes. Append failures are logged and counted, never raised.
pub struct DataSink {
    config: LogSinkConfig,
    last_log: Option<DateTime<Utc>>,
    records_written: u64,
}

impl DataSink {
    pub fn new(config: LogSinkConfig) -> Self {
        if config.enabled {
            if let Err(e) = std::fs::create_dir_all(&config.directory) {
                warn!(
                    error = %e,
                    dir = %config.directory.display(),
                    "failed to create log directory"
                );
            }
        }
        Self {
            config,
            last_log: None,
            records_written: 0,
        }
    }

    /// The artifact path for the given instant's calendar day.
    pub fn active_path(&self, now: DateTime<Utc>) -> PathBuf {
        let extension = match self.config.format {
            RecordFormat::Csv => "csv",
            RecordFormat::Json => "jsonl",
        };
        self.config
            .directory
            .join(format!("crowdwatch_{}.{}", now.format("%Y%m%d"), extension))
    }

    /// Append one record unless the interval since the last write has not
    /// yet elapsed. Returns whether a record was persisted.
    pub fn log_if_due(
        &mut self,
        analysis: &AnalysisResult,
        alert: &AlertResult,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        if let Some(last) = self.last_log {
            if (now - last).num_milliseconds() as f64 / 1000.0 < self.config.log_interval_seconds {
                return false;
            }
        }
        self.last_log = Some(now);

        let path = self.active_path(now);
        let outcome = match self.config.format {
            RecordFormat::Csv => append_csv(&path, analysis, alert, now),
            RecordFormat::Json => append_json(&path, analysis, alert, now),
        };

        let format_label = self.config.format.to_string();
        match outcome {
            Ok(()) => {
                self.records_written += 1;
                telemetry::metrics::RECORD_APPENDS
                    .with_label_values(&[&format_label, "ok"])
                    .inc();
                true
            }
            Err(e) => {
                telemetry::metrics::RECORD_APPENDS
                    .with_label_values(&[&format_label, "error"])
                    .inc();
                error!(error = %e, path = %path.display(), "failed to append log record");
                false
            }
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Log a closing summary; appends are unbuffered so there is nothing
    /// else to flush.
    pub fn close(&self) {
        if self.config.enabled {
            info!(records = self.records_written, "data sink closed");
        }
    }
}

fn epoch_seconds(now: DateTime<Utc>) -> f64 {
    now.timestamp_millis() as f64 / 1000.0
}

fn append_csv(
    path: &Path,
    analysis: &AnalysisResult,
    alert: &AlertResult,
    now: DateTime<Utc>,
) -> Result<()> {
    let is_new = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;

    if is_new {
        writeln!(file, "{}", CSV_HEADER).context("write csv header")?;
    }

    let anomalies = serde_json::to_string(&analysis.anomalies).context("serialize anomalies")?;

    writeln!(
        file,
        "{:.3},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        epoch_seconds(now),
        now.format("%Y-%m-%d %H:%M:%S"),
        analysis.person_count,
        analysis.smoothed_count,
        analysis.density_score,
        analysis.smoothed_density,
        analysis.crowd_level,
        alert.level,
        analysis.spatial.center_of_mass.0,
        analysis.spatial.center_of_mass.1,
        analysis.spatial.spread,
        analysis.spatial.clustering_score,
        analysis.spatial.edge_density,
        analysis.trends.count_trend,
        analysis.trends.density_trend,
        csv_quote(&anomalies),
    )
    .context("write csv record")?;

    Ok(())
}

/// Quote a CSV field, doubling any embedded quotes.
fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn append_json(
    path: &Path,
    analysis: &AnalysisResult,
    alert: &AlertResult,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;

    let record = serde_json::json!({
        "timestamp": epoch_seconds(now),
        "datetime": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "person_count": analysis.person_count,
        "smoothed_count": analysis.smoothed_count,
        "density_score": analysis.density_score,
        "smoothed_density": analysis.smoothed_density,
        "crowd_level": analysis.crowd_level,
        "alert_level": alert.level,
        "center_of_mass_x": analysis.spatial.center_of_mass.0,
        "center_of_mass_y": analysis.spatial.center_of_mass.1,
        "spread": analysis.spatial.spread,
        "clustering_score": analysis.spatial.clustering_score,
        "edge_density": analysis.spatial.edge_density,
        "count_trend": analysis.trends.count_trend,
        "density_trend": analysis.trends.density_trend,
        "anomalies": analysis.anomalies,
    });

    writeln!(file, "{}", record).context("write json record")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertLevel, AlertTrigger};
    use chrono::TimeZone;
    use common::analysis::{AnomalyReport, CrowdLevel, SpatialSummary, TrendReport};
    use std::str::FromStr;

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            timestamp: at(0),
            person_count: 75,
            smoothed_count: 72.5,
            density_score: 0.65,
            smoothed_density: 0.63,
            crowd_level: CrowdLevel::High,
            density_heatmap: vec![vec![0.0; 10]; 10],
            spatial: SpatialSummary {
                center_of_mass: (320.0, 240.0),
                spread: 45.2,
                clustering_score: 0.7,
                edge_density: 0.2,
            },
            trends: TrendReport::default(),
            anomalies: AnomalyReport {
                count_anomaly: false,
                density_anomaly: true,
                sudden_change: false,
            },
        }
    }

    fn alert() -> AlertResult {
        AlertResult {
            triggered: true,
            level: AlertLevel::High,
            alert_type: AlertTrigger::Threshold,
            message: "High crowd density detected: 72.5 people".to_string(),
            actions_taken: vec!["console_output".to_string()],
            event_id: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
    }

    fn sink(dir: &Path, format: RecordFormat, interval: f64) -> DataSink {
        DataSink::new(LogSinkConfig {
            directory: dir.to_path_buf(),
            format,
            log_interval_seconds: interval,
            ..LogSinkConfig::default()
        })
    }

    #[test]
    fn test_rate_limit_writes_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), RecordFormat::Csv, 5.0);

        assert!(sink.log_if_due(&analysis(), &alert(), at(0)));
        assert!(!sink.log_if_due(&analysis(), &alert(), at(3)));
        assert_eq!(sink.records_written(), 1);

        assert!(sink.log_if_due(&analysis(), &alert(), at(6)));
        assert_eq!(sink.records_written(), 2);
    }

    #[test]
    fn test_csv_header_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), RecordFormat::Csv, 0.0);

        sink.log_if_due(&analysis(), &alert(), at(0));
        sink.log_if_due(&analysis(), &alert(), at(10));

        let content = std::fs::read_to_string(sink.active_path(at(0))).unwrap();
        let header_lines = content
            .lines()
            .filter(|l| l.starts_with("timestamp,"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), RecordFormat::Csv, 0.0);
        sink.log_if_due(&analysis(), &alert(), at(0));

        let content = std::fs::read_to_string(sink.active_path(at(0))).unwrap();
        let record = content.lines().nth(1).unwrap();
        let fields: Vec<&str> = record.split(',').collect();

        assert_eq!(fields[2].parse::<usize>().unwrap(), 75);
        assert_eq!(CrowdLevel::from_str(fields[6]).unwrap(), CrowdLevel::High);
        assert_eq!(AlertLevel::from_str(fields[7]).unwrap(), AlertLevel::High);
    }

    #[test]
    fn test_csv_anomalies_field_is_quoted_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), RecordFormat::Csv, 0.0);
        sink.log_if_due(&analysis(), &alert(), at(0));

        let content = std::fs::read_to_string(sink.active_path(at(0))).unwrap();
        let record = content.lines().nth(1).unwrap();
        let quoted_start = record.find('"').unwrap();
        let json_text = record[quoted_start..]
            .trim_matches('"')
            .replace("\"\"", "\"");
        let parsed: AnomalyReport = serde_json::from_str(&json_text).unwrap();
        assert!(parsed.density_anomaly);
        assert!(!parsed.count_anomaly);
    }

    #[test]
    fn test_json_lines_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), RecordFormat::Json, 0.0);
        sink.log_if_due(&analysis(), &alert(), at(0));
        sink.log_if_due(&analysis(), &alert(), at(10));

        let content = std::fs::read_to_string(sink.active_path(at(0))).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["person_count"], 75);
            assert_eq!(record["crowd_level"], "high");
            assert_eq!(record["alert_level"], "high");
            assert_eq!(record["anomalies"]["density_anomaly"], true);
        }
    }

    #[test]
    fn test_rotates_by_calendar_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), RecordFormat::Csv, 0.0);

        let day_one = Utc.with_ymd_and_hms(2026, 8, 6, 23, 59, 0).single().unwrap();
        let day_two = Utc.with_ymd_and_hms(2026, 8, 7, 0, 1, 0).single().unwrap();

        sink.log_if_due(&analysis(), &alert(), day_one);
        sink.log_if_due(&analysis(), &alert(), day_two);

        let path_one = sink.active_path(day_one);
        let path_two = sink.active_path(day_two);
        assert_ne!(path_one, path_two);

        for path in [path_one, path_two] {
            let content = std::fs::read_to_string(path).unwrap();
            assert_eq!(content.lines().count(), 2);
            assert!(content.starts_with("timestamp,"));
        }
    }

    #[test]
    fn test_disabled_sink_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DataSink::new(LogSinkConfig {
            directory: dir.path().to_path_buf(),
            enabled: false,
            log_interval_seconds: 0.0,
            ..LogSinkConfig::default()
        });

        assert!(!sink.log_if_due(&analysis(), &alert(), at(0)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}

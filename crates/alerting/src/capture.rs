//! Rate-limited alert frame capture.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::detections::Frame;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::LogSinkConfig;
use crate::types::AlertResult;

/// Writes a JPEG of the current frame while an alert is active, at most
/// once per configured interval. Failures are logged and recorded, never
/// raised into the frame loop.
pub struct AlertImageWriter {
    enabled: bool,
    directory: PathBuf,
    interval_seconds: f64,
    last_saved: Option<DateTime<Utc>>,
}

impl AlertImageWriter {
    pub fn new(config: &LogSinkConfig) -> Self {
        let directory = config.directory.join("images");
        if config.save_images {
            if let Err(e) = std::fs::create_dir_all(&directory) {
                warn!(
                    error = %e,
                    dir = %directory.display(),
                    "failed to create alert image directory"
                );
            }
        }
        Self {
            enabled: config.save_images,
            directory,
            interval_seconds: config.image_interval_seconds,
            last_saved: None,
        }
    }

    /// Save the frame if an alert is active and the interval has elapsed.
    /// Returns the action string to record, if a save was attempted.
    pub fn save_if_due(
        &mut self,
        frame: &Frame,
        alert: &AlertResult,
        now: DateTime<Utc>,
    ) -> Option<&'static str> {
        if !self.enabled || !alert.triggered {
            return None;
        }
        if let Some(last) = self.last_saved {
            if (now - last).num_milliseconds() as f64 / 1000.0 < self.interval_seconds {
                return None;
            }
        }

        let filename = format!("alert_{}_{}.jpg", alert.level, now.format("%Y%m%d_%H%M%S"));
        let path = self.directory.join(filename);

        match write_jpeg(frame, &path) {
            Ok(()) => {
                // Stamped only on success so a failed save retries promptly.
                self.last_saved = Some(now);
                telemetry::metrics::ALERT_IMAGES
                    .with_label_values(&["ok"])
                    .inc();
                info!(path = %path.display(), "alert image saved");
                Some("image_saved")
            }
            Err(e) => {
                telemetry::metrics::ALERT_IMAGES
                    .with_label_values(&["error"])
                    .inc();
                error!(error = %e, path = %path.display(), "failed to save alert image");
                Some("image_failed")
            }
        }
    }
}

fn write_jpeg(frame: &Frame, path: &Path) -> Result<()> {
    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame byte length does not match dimensions")?;
    image.save(path).context("image encode failed")?;
    Ok(())
}

//! Stateful alert decision and dispatch.

use chrono::{DateTime, Utc};
use common::analysis::AnalysisResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AlertConfig;
use crate::notify::{EmailChannel, NotificationChannel};
use crate::types::{AlertEngineStats, AlertKind, AlertLevel, AlertResult, AlertTrigger};

/// Per-session alert state machine.
///
/// Each evaluation computes a threshold candidate (crowd level high or
/// critical, that level's cooldown elapsed) and an anomaly candidate (any
/// anomaly flag, anomaly cooldown elapsed). When both qualify the threshold
/// alert wins and the anomaly cooldown is left untouched, so the suppressed
/// anomaly stays eligible on the next cycle. Cooldowns are stamped at
/// decision time, before any channel dispatch runs.
pub struct AlertEngine {
    config: AlertConfig,
    channels: Vec<Arc<dyn NotificationChannel>>,
    last_alert: HashMap<AlertKind, DateTime<Utc>>,
    current_level: AlertLevel,
}

impl AlertEngine {
    pub fn new(config: AlertConfig) -> Self {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

        if config.email_notifications {
            match &config.email {
                Some(email) if !email.smtp_host.is_empty() && !email.recipients.is_empty() => {
                    channels.push(Arc::new(EmailChannel::new(email.clone())));
                }
                _ => {
                    warn!("email configuration incomplete, email alerts disabled");
                }
            }
        }

        Self {
            config,
            channels,
            last_alert: HashMap::new(),
            current_level: AlertLevel::None,
        }
    }

    /// Register an additional notification channel.
    pub fn add_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels.push(channel);
    }

    pub fn current_level(&self) -> AlertLevel {
        self.current_level
    }

    /// Run one evaluation cycle against the frame's analysis.
    pub async fn evaluate(&mut self, analysis: &AnalysisResult, now: DateTime<Utc>) -> AlertResult {
        if !self.config.enabled {
            self.current_level = AlertLevel::None;
            return AlertResult::none();
        }

        let threshold_candidate = if analysis.crowd_level.is_alertable()
            && self.cooldown_elapsed(AlertKind::Level(analysis.crowd_level), now)
        {
            Some(AlertKind::Level(analysis.crowd_level))
        } else {
            None
        };

        let anomaly_candidate = if analysis.anomalies.any()
            && self.cooldown_elapsed(AlertKind::Anomaly, now)
        {
            Some(AlertKind::Anomaly)
        } else {
            None
        };

        // Threshold alerts take priority; a suppressed anomaly keeps its
        // cooldown untouched because it did not fire.
        let Some(kind) = threshold_candidate.or(anomaly_candidate) else {
            self.current_level = AlertLevel::None;
            return AlertResult::none();
        };

        // Stamp before dispatch: a slow notification in flight must not let
        // the same kind re-trigger.
        self.last_alert.insert(kind, now);

        let (level, trigger, message) = match kind {
            AlertKind::Level(crowd_level) => (
                AlertLevel::from(crowd_level),
                AlertTrigger::Threshold,
                format!(
                    "{} crowd density detected: {:.1} people",
                    title_case(&crowd_level.to_string()),
                    analysis.smoothed_count
                ),
            ),
            AlertKind::Anomaly => (
                AlertLevel::Anomaly,
                AlertTrigger::Anomaly,
                format!(
                    "Anomaly detected: {}",
                    analysis.anomalies.labels().join(", ")
                ),
            ),
        };

        self.current_level = level;

        let mut result = AlertResult {
            triggered: true,
            level,
            alert_type: trigger,
            message,
            actions_taken: Vec::new(),
            event_id: Some(Uuid::new_v4()),
        };

        telemetry::metrics::ALERTS_FIRED
            .with_label_values(&[&level.to_string()])
            .inc();
        info!(
            event_id = %result.event_id.unwrap_or_default(),
            level = %level,
            trigger = %trigger,
            "alert fired"
        );

        self.dispatch(&mut result, analysis, now).await;

        result
    }

    fn cooldown_elapsed(&self, kind: AlertKind, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(&kind) {
            None => true,
            Some(last) => {
                (now - *last).num_milliseconds() as f64 / 1000.0 >= self.config.cooldown_seconds
            }
        }
    }

    /// Run the configured side effects; each channel fails independently.
    async fn dispatch(
        &self,
        result: &mut AlertResult,
        analysis: &AnalysisResult,
        now: DateTime<Utc>,
    ) {
        if self.config.console_output {
            print_console_alert(result, analysis, now);
            result.actions_taken.push("console_output".to_string());
        }

        if !self.channels.is_empty() {
            let subject = format!("Crowd Alert - {}", title_case(&result.level.to_string()));
            let body = render_notification_body(result, analysis, now);

            for channel in &self.channels {
                match channel.send(&subject, &body).await {
                    Ok(()) => {
                        telemetry::metrics::NOTIFICATIONS
                            .with_label_values(&[channel.name(), "sent"])
                            .inc();
                        result.actions_taken.push(format!("{}_sent", channel.name()));
                    }
                    Err(e) => {
                        error!(
                            channel = channel.name(),
                            error = %e,
                            "failed to send notification"
                        );
                        telemetry::metrics::NOTIFICATIONS
                            .with_label_values(&[channel.name(), "failed"])
                            .inc();
                        result
                            .actions_taken
                            .push(format!("{}_failed", channel.name()));
                    }
                }
            }
        }

        if self.config.sound_alerts {
            // Platform sound backends vary; the cue is a log line.
            info!(level = %result.level, "sound alert cue");
            result.actions_taken.push("sound_alert".to_string());
        }
    }

    pub fn statistics(&self) -> AlertEngineStats {
        AlertEngineStats {
            current_level: self.current_level,
            cooldown_seconds: self.config.cooldown_seconds,
            last_alert_times: self
                .last_alert
                .iter()
                .map(|(kind, at)| (kind.to_string(), *at))
                .collect(),
            channels: self
                .channels
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        }
    }

    /// Clear cooldowns and the current level.
    pub fn reset(&mut self) {
        self.last_alert.clear();
        self.current_level = AlertLevel::None;
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn print_console_alert(result: &AlertResult, analysis: &AnalysisResult, now: DateTime<Utc>) {
    let bar = "=".repeat(60);
    println!("\n{}", bar);
    println!("CROWD ALERT - {}", now.format("%Y-%m-%d %H:%M:%S"));
    println!("{}", bar);
    println!("Alert Level: {}", result.level.to_string().to_uppercase());
    println!("Alert Type: {}", result.alert_type.to_string().to_uppercase());
    println!("Message: {}", result.message);
    println!("Person Count: {}", analysis.person_count);
    println!("Smoothed Count: {:.1}", analysis.smoothed_count);
    println!("Density Score: {:.3}", analysis.density_score);
    println!(
        "Crowd Level: {}",
        analysis.crowd_level.to_string().to_uppercase()
    );
    println!("Count Trend: {}", analysis.trends.count_trend);
    println!("Density Trend: {}", analysis.trends.density_trend);
    println!("{}\n", bar);
}

fn render_notification_body(
    result: &AlertResult,
    analysis: &AnalysisResult,
    now: DateTime<Utc>,
) -> String {
    format!(
        "Crowd Detection Alert\n\n\
        Timestamp: {}\n\
        Alert Level: {}\n\
        Message: {}\n\n\
        Crowd Metrics\n\
        - Person Count: {}\n\
        - Smoothed Count: {:.1}\n\
        - Density Score: {:.3}\n\
        - Crowd Level: {}\n\n\
        Spatial Analysis\n\
        - Center of Mass: ({:.1}, {:.1})\n\
        - Spread: {:.2}\n\
        - Clustering Score: {:.3}\n\
        - Edge Density: {:.3}\n\n\
        Trends\n\
        - Count Trend: {}\n\
        - Density Trend: {}\n",
        now.format("%Y-%m-%d %H:%M:%S"),
        result.level.to_string().to_uppercase(),
        result.message,
        analysis.person_count,
        analysis.smoothed_count,
        analysis.density_score,
        analysis.crowd_level.to_string().to_uppercase(),
        analysis.spatial.center_of_mass.0,
        analysis.spatial.center_of_mass.1,
        analysis.spatial.spread,
        analysis.spatial.clustering_score,
        analysis.spatial.edge_density,
        analysis.trends.count_trend,
        analysis.trends.density_trend,
    )
}

//! Notification channels for alert dispatch.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("message build failed: {0}")]
    Message(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A side-effect channel for delivering alert notifications. Failure is a
/// returned error, never a panic; the alert engine records it as a failed
/// action and carries on.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), ChannelError>;

    /// Short channel name used in action strings and metrics labels.
    fn name(&self) -> &'static str;
}

pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, subject: &str, body: &str) -> Result<(), ChannelError> {
        let mut builder = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e: lettre::address::AddressError| ChannelError::Address(e.to_string()))?,
            )
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for to in &self.config.recipients {
            builder = builder.to(to
                .parse()
                .map_err(|e: lettre::address::AddressError| ChannelError::Address(e.to_string()))?);
        }

        let email = builder
            .body(body.to_string())
            .map_err(|e| ChannelError::Message(e.to_string()))?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| ChannelError::Transport(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(&email)
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        info!(recipients = ?self.config.recipients, "email notification sent");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

/// In-memory channel that records every send. Used by tests and demos in
/// place of a real transport; can be configured to fail every send.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, subject: &str, body: &str) -> Result<(), ChannelError> {
        if self.fail {
            return Err(ChannelError::Transport("channel configured to fail".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((subject.to_string(), body.to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

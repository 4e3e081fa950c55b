//! NotificationChannel - SMS Alerts via Twilio
//!
//! ## Responsibilities
//!
//! - Send threat alert SMS through the Twilio Messages API
//!
//! Failures are reported to the caller (the EffectDispatcher), which
//! logs and contains them; nothing here retries.

use crate::config::TwilioConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Notification channel boundary
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send an alert for a detected threat
    async fn send_alert(&self, label: &str, confidence: f64) -> Result<()>;
}

/// Twilio-backed SMS notifier
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    /// Create a new TwilioNotifier
    pub fn new(config: TwilioConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

#[async_trait]
impl NotificationChannel for TwilioNotifier {
    async fn send_alert(&self, label: &str, confidence: f64) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );

        let body = format!(
            "ALERT! Possible Threat Detected!\nType: {}\nConfidence: {:.2}",
            label, confidence
        );

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("Body", body.as_str()),
                ("From", self.config.from_number.as_str()),
                ("To", self.config.to_number.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Internal(format!(
                "Twilio API returned {}",
                resp.status()
            )));
        }

        tracing::info!(label = %label, confidence = confidence, "SMS alert sent");
        Ok(())
    }
}

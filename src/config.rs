//! Application configuration
//!
//! All knobs come from the environment (a `.env` file is loaded in main).
//! Missing notification/actuator settings disable that sink instead of
//! failing startup.

use std::path::PathBuf;
use std::time::Duration;

/// Twilio SMS settings
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl TwilioConfig {
    /// Read Twilio settings from environment; None if any is missing
    pub fn from_env() -> Option<Self> {
        Some(Self {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok()?,
            auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok()?,
            from_number: std::env::var("TWILIO_PHONE_NUMBER").ok()?,
            to_number: std::env::var("ALERT_PHONE_NUMBER").ok()?,
        })
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Camera source (V4L2 device path or RTSP URL)
    pub camera_source: String,
    /// Capture tick interval
    pub capture_interval: Duration,
    /// Per-frame capture timeout in seconds
    pub capture_timeout_sec: u64,
    /// Classifier model server URL
    pub classifier_url: String,
    /// Minimum confidence for a prediction to qualify as a threat
    pub confidence_threshold: f64,
    /// Alert cooldown window in seconds
    pub cooldown_seconds: f64,
    /// Labels considered actionable threats
    pub threat_labels: Vec<String>,
    /// Twilio settings (None disables SMS alerts)
    pub twilio: Option<TwilioConfig>,
    /// Buzzer device endpoint (None disables actuation)
    pub buzzer_url: Option<String>,
    /// SQLite database URL for threat history
    pub database_url: String,
    /// Directory for saved evidence images
    pub images_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            camera_source: std::env::var("CAMERA_SOURCE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            capture_interval: Duration::from_millis(
                std::env::var("CAPTURE_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            capture_timeout_sec: std::env::var("CAPTURE_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            classifier_url: std::env::var("CLASSIFIER_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            confidence_threshold: std::env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.25),
            cooldown_seconds: std::env::var("COOLDOWN_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5.0),
            threat_labels: std::env::var("THREAT_LABELS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| default_threat_labels()),
            twilio: TwilioConfig::from_env(),
            buzzer_url: std::env::var("BUZZER_URL").ok(),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://threat_history.db?mode=rwc".to_string()),
            images_dir: std::env::var("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./threat_images")),
        }
    }
}

/// Threat labels used when THREAT_LABELS is not set
///
/// Matches the classifier prompt set; anything else is benign.
fn default_threat_labels() -> Vec<String> {
    [
        "fire on a street",
        "car crash",
        "fighting on a street",
        "person with a weapon",
        "robbery in progress",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threat_labels_nonempty() {
        let labels = default_threat_labels();
        assert!(labels.contains(&"fire on a street".to_string()));
        assert!(labels.contains(&"car crash".to_string()));
    }
}

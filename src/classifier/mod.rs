//! Classifier - Model Server Adapter
//!
//! ## Responsibilities
//!
//! - Send frames to the vision-language model server
//! - Parse label/confidence responses
//! - Health checking
//!
//! The model itself (feature extraction, similarity scoring) is a black
//! box behind this boundary; classification always happens outside the
//! FrameStore lock.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Threat status derived from label membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatStatus {
    Threat,
    NonThreat,
}

/// A classification result for a single frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    pub threat_status: ThreatStatus,
}

/// Raw model server response (label + confidence only)
#[derive(Debug, Clone, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub confidence: f64,
}

/// Classifier boundary
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single JPEG frame
    async fn classify(&self, frame: &[u8]) -> Result<RawPrediction>;
}

/// Classifier backed by a remote model server
pub struct RemoteClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteClassifier {
    /// Create a new RemoteClassifier
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Check model server availability
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, frame: &[u8]) -> Result<RawPrediction> {
        let url = format!("{}/classify", self.base_url);

        let part = Part::bytes(frame.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| Error::Classifier(format!("multipart build failed: {}", e)))?;
        let form = Form::new().part("image", part);

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Classifier(format!("model server unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Classifier(format!(
                "model server returned {}",
                resp.status()
            )));
        }

        let raw: RawPrediction = resp
            .json()
            .await
            .map_err(|e| Error::Classifier(format!("invalid model response: {}", e)))?;

        tracing::trace!(
            label = %raw.label,
            confidence = raw.confidence,
            "Frame classified"
        );

        Ok(raw)
    }
}

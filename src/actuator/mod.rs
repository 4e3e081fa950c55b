//! ActuatorChannel - Remote Buzzer Trigger
//!
//! Thin HTTP adapter: the buzzer device exposes a fixed endpoint that
//! sounds on GET. Fire-and-forget from the dispatcher's point of view.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Actuator channel boundary
#[async_trait]
pub trait ActuatorChannel: Send + Sync {
    /// Trigger the physical actuator
    async fn trigger(&self) -> Result<()>;
}

/// HTTP buzzer client
pub struct BuzzerClient {
    client: reqwest::Client,
    url: String,
}

impl BuzzerClient {
    /// Create a new BuzzerClient for the device endpoint
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, url }
    }
}

#[async_trait]
impl ActuatorChannel for BuzzerClient {
    async fn trigger(&self) -> Result<()> {
        let resp = self.client.get(&self.url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Internal(format!(
                "Buzzer endpoint returned {}",
                resp.status()
            )));
        }

        tracing::info!(url = %self.url, "Buzzer triggered");
        Ok(())
    }
}

//! HTTP client for the appliance API.
//!
//! Requests deliberately carry no timeout: a hung call parks only the task
//! that issued it, and callers fire most of these from detached tasks whose
//! results they discard.

use anyhow::{Context, Result};

use crate::api::{
    Ack, QueueAddRequest, QueueResponse, StatusResponse, VolumeRequest, VolumeValue,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_status(&self) -> Result<StatusResponse> {
        let url = format!("{}/api/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to fetch status")?;

        if !response.status().is_success() {
            anyhow::bail!("Status endpoint returned {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse status response")
    }

    pub async fn get_queue(&self) -> Result<QueueResponse> {
        let url = format!("{}/api/queue", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to fetch queue")?;

        if !response.status().is_success() {
            anyhow::bail!("Queue endpoint returned {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse queue response")
    }

    /// Post a volume change.  The wire value is the slider's string form.
    pub async fn set_volume(&self, volume: VolumeValue) -> Result<()> {
        let url = format!("{}/api/volume", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&VolumeRequest { volume })
            .send()
            .await
            .context("Failed to post volume")?;

        if !response.status().is_success() {
            anyhow::bail!("Volume endpoint returned {}", response.status());
        }
        Ok(())
    }

    /// Ask the appliance to pull playback back onto itself.  Empty body.
    pub async fn reclaim_playback(&self) -> Result<()> {
        let url = format!("{}/api/playback/reclaim", self.base_url);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .context("Failed to post reclaim")?;

        if !response.status().is_success() {
            anyhow::bail!("Reclaim endpoint returned {}", response.status());
        }
        Ok(())
    }

    pub async fn queue_add(&self, uri: impl Into<String>) -> Result<Ack> {
        let url = format!("{}/api/queue/add", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&QueueAddRequest { uri: uri.into() })
            .send()
            .await
            .context("Failed to post queue add")?;

        if !response.status().is_success() {
            anyhow::bail!("Queue add endpoint returned {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse queue add response")
    }
}

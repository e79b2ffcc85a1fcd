// src/sensor/transport.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::SensorError;
use crate::utils::config::SensorConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub device_type: String,
    pub baud_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectResponse {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub device_type: String,
    pub timeout: u64,
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub fingerprint_data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Wire seam between the sensor client and the capture service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorTransport: Send + Sync {
    async fn status(&self) -> Result<(), SensorError>;
    async fn connect(&self, request: &ConnectRequest) -> Result<ConnectResponse, SensorError>;
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResponse, SensorError>;
    async fn disconnect(&self) -> Result<(), SensorError>;
}

/// RD Services over HTTP/JSON.
pub struct RdServiceTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RdServiceTransport {
    pub fn new(config: &SensorConfig) -> Result<Self, SensorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| SensorError::Unreachable(e.to_string()))?;

        Ok(Self::with_client(client, &config.endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SensorError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SensorError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl SensorTransport for RdServiceTransport {
    async fn status(&self) -> Result<(), SensorError> {
        let response = self.client.get(self.url("/status")).send().await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    async fn connect(&self, request: &ConnectRequest) -> Result<ConnectResponse, SensorError> {
        let response = self
            .client
            .post(self.url("/connect"))
            .json(request)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResponse, SensorError> {
        let response = self
            .client
            .post(self.url("/capture"))
            .json(request)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn disconnect(&self) -> Result<(), SensorError> {
        self.client
            .post(self.url("/disconnect"))
            .header("Content-Type", "application/json")
            .send()
            .await?;
        Ok(())
    }
}

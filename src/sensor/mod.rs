// src/sensor/mod.rs
//! Fingerprint capture through a Mantra MFS110 behind RD Services, with a
//! simulated fallback when the service cannot be reached.

mod client;
mod simulation;
mod transport;

pub use client::SensorClient;
pub use simulation::generate_simulated_sample;
pub use transport::{
    CaptureRequest, CaptureResponse, ConnectRequest, ConnectResponse, RdServiceTransport,
    SensorTransport,
};

#[cfg(test)]
pub use transport::MockSensorTransport;

use thiserror::Error;

use crate::core::identity::types::BiometricIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Disconnected,
    Connecting,
    Connected,
    Capturing,
    Captured,
    Failed,
}

/// Whether captures go to the device or are simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    Device,
    Simulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Device,
    Simulated,
}

/// Published to every subscriber once a capture settles.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Captured {
        identifier: BiometricIdentifier,
        source: CaptureSource,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SensorError {
    #[error("RD Services unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to communicate with RD Services (HTTP {0})")]
    Status(u16),

    #[error("Fingerprint capture timed out")]
    Timeout,

    #[error("Failed to capture fingerprint: {0}")]
    Rejected(String),

    #[error("Invalid response from RD Services: {0}")]
    InvalidResponse(String),

    #[error("A capture is already in progress")]
    CaptureInProgress,
}

impl SensorError {
    /// The service could not be talked to at all; these captures fall back
    /// to simulation instead of failing.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SensorError::Unreachable(_) | SensorError::Status(_))
    }
}

impl From<reqwest::Error> for SensorError {
    fn from(error: reqwest::Error) -> Self {
        // a connect timeout is also a timeout, but it means unreachable
        if error.is_connect() {
            SensorError::Unreachable(error.to_string())
        } else if error.is_timeout() {
            SensorError::Timeout
        } else if error.is_decode() {
            SensorError::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            SensorError::Status(status.as_u16())
        } else {
            SensorError::Unreachable(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    fn closed_port() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_connect_failure_is_unreachable() {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let error = client.get(closed_port()).send().await.unwrap_err();
        assert!(error.is_connect());

        let mapped = SensorError::from(error);
        assert!(matches!(mapped, SensorError::Unreachable(_)));
        assert!(mapped.is_unreachable());
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let error = client.get(server.uri()).send().await.unwrap_err();
        assert!(!error.is_connect());

        let mapped = SensorError::from(error);
        assert_eq!(mapped, SensorError::Timeout);
        assert!(!mapped.is_unreachable());
    }

    #[test]
    fn test_status_errors_fall_back() {
        assert!(SensorError::Status(503).is_unreachable());
        assert!(!SensorError::Rejected("Finger not placed properly".into()).is_unreachable());
    }
}

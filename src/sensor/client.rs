// src/sensor/client.rs
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::{
    generate_simulated_sample, CaptureEvent, CaptureRequest, CaptureSource, ConnectRequest,
    RdServiceTransport, SensorError, SensorMode, SensorState, SensorTransport,
};
use crate::core::identity::normalizer::{is_truthy, normalize};
use crate::core::identity::types::BiometricIdentifier;
use crate::utils::config::SensorConfig;

const EVENT_CAPACITY: usize = 64;
const DEFAULT_REJECTION: &str = "Failed to capture fingerprint";

/// One fingerprint sensor shared by every flow of a front-desk session.
///
/// Capture outcomes are returned to the caller and also published on a
/// broadcast channel; see [`SensorClient::subscribe`].
pub struct SensorClient {
    transport: Arc<dyn SensorTransport>,
    config: SensorConfig,
    state: RwLock<SensorState>,
    mode: RwLock<SensorMode>,
    connected: AtomicBool,
    capturing: AtomicBool,
    identifier: RwLock<Option<BiometricIdentifier>>,
    events: broadcast::Sender<CaptureEvent>,
}

/// Clears the re-entrancy flag when a capture settles, however it ends.
struct CaptureGuard<'a>(&'a AtomicBool);

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SensorClient {
    pub fn new(transport: Arc<dyn SensorTransport>, config: SensorConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            config,
            state: RwLock::new(SensorState::Disconnected),
            mode: RwLock::new(SensorMode::Device),
            connected: AtomicBool::new(false),
            capturing: AtomicBool::new(false),
            identifier: RwLock::new(None),
            events,
        }
    }

    pub fn from_config(config: &SensorConfig) -> Result<Self, SensorError> {
        let transport = RdServiceTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.clone()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SensorState {
        *self.state.read()
    }

    pub fn mode(&self) -> SensorMode {
        *self.mode.read()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn identifier(&self) -> Option<BiometricIdentifier> {
        self.identifier.read().clone()
    }

    /// Start-up reachability check. A reachable service counts as connected;
    /// anything else switches to simulation.
    pub async fn probe(&self) -> bool {
        match self.transport.status().await {
            Ok(()) => {
                info!("Connected to RD Services at {}", self.config.endpoint);
                self.mark_connected();
                true
            }
            Err(e) => {
                warn!("RD Services not available ({}), using simulation mode", e);
                self.enter_simulation();
                false
            }
        }
    }

    pub async fn test_connection(&self) -> bool {
        self.transport.status().await.is_ok()
    }

    pub async fn connect(&self) -> bool {
        self.set_state(SensorState::Connecting);

        let request = ConnectRequest {
            device_type: self.config.device_type.clone(),
            baud_rate: self.config.baud_rate,
        };

        match self.transport.connect(&request).await {
            Ok(response) if response.success => {
                info!("Connected to Mantra {}", self.config.device_type);
                self.mark_connected();
                true
            }
            Ok(_) => {
                warn!("RD Services refused the connection, using simulation mode");
                self.enter_simulation();
                false
            }
            Err(e) => {
                warn!("Error connecting to RD Services: {}", e);
                self.enter_simulation();
                false
            }
        }
    }

    pub async fn capture(&self) -> Result<BiometricIdentifier, SensorError> {
        self.capture_with_timeout(Duration::from_millis(self.config.capture_timeout_ms))
            .await
    }

    /// Takes one sample. Unreachable services fall back to a simulated
    /// sample; a reachable service that reports failure does not.
    pub async fn capture_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<BiometricIdentifier, SensorError> {
        if self
            .capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Ignoring capture request while another capture is in flight");
            return Err(SensorError::CaptureInProgress);
        }
        let _guard = CaptureGuard(&self.capturing);

        match self.run_capture(timeout).await {
            Ok((identifier, source)) => {
                *self.identifier.write() = Some(identifier.clone());
                self.set_state(SensorState::Captured);
                info!(?source, "Fingerprint captured successfully");
                self.publish(CaptureEvent::Captured {
                    identifier: identifier.clone(),
                    source,
                });
                Ok(identifier)
            }
            Err(e) => {
                self.set_state(SensorState::Failed);
                error!("Error capturing fingerprint: {}", e);
                self.publish(CaptureEvent::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_capture(
        &self,
        timeout: Duration,
    ) -> Result<(BiometricIdentifier, CaptureSource), SensorError> {
        if !self.is_connected() && !self.connect().await {
            return Ok(self.simulate().await);
        }

        self.set_state(SensorState::Capturing);

        let request = CaptureRequest {
            device_type: self.config.device_type.clone(),
            timeout: timeout.as_millis() as u64,
            quality: self.config.quality.clone(),
        };

        let response = match tokio::time::timeout(timeout, self.transport.capture(&request)).await
        {
            Err(_) => return Err(SensorError::Timeout),
            Ok(Err(e)) if e.is_unreachable() => {
                warn!("Lost RD Services during capture ({}), trying fallback", e);
                self.enter_simulation();
                return Ok(self.simulate().await);
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(response)) => response,
        };

        match response.fingerprint_data {
            Some(data) if response.success && is_truthy(&data) => {
                Ok((normalize(&data), CaptureSource::Device))
            }
            _ => Err(SensorError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
            )),
        }
    }

    async fn simulate(&self) -> (BiometricIdentifier, CaptureSource) {
        self.set_state(SensorState::Capturing);
        tokio::time::sleep(Duration::from_millis(self.config.simulation_delay_ms)).await;

        let sample = serde_json::Value::String(generate_simulated_sample());
        (normalize(&sample), CaptureSource::Simulated)
    }

    /// Drops any held identifier; idempotent.
    pub fn clear(&self) {
        *self.identifier.write() = None;
        let ready = if self.is_connected() {
            SensorState::Connected
        } else {
            SensorState::Disconnected
        };
        self.set_state(ready);
    }

    pub async fn disconnect(&self) {
        if self.is_connected() {
            if let Err(e) = self.transport.disconnect().await {
                error!("Error disconnecting: {}", e);
            }
        }

        self.connected.store(false, Ordering::Release);
        self.set_state(SensorState::Disconnected);
        info!("Disconnected from RD Services");
    }

    fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
        *self.mode.write() = SensorMode::Device;
        self.set_state(SensorState::Connected);
    }

    fn enter_simulation(&self) {
        self.connected.store(false, Ordering::Release);
        *self.mode.write() = SensorMode::Simulation;
        self.set_state(SensorState::Disconnected);
    }

    fn set_state(&self, state: SensorState) {
        *self.state.write() = state;
    }

    fn publish(&self, event: CaptureEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{CaptureResponse, ConnectResponse, MockSensorTransport};
    use async_trait::async_trait;
    use serde_json::json;

    fn fast_config() -> SensorConfig {
        SensorConfig {
            simulation_delay_ms: 0,
            capture_timeout_ms: 200,
            ..SensorConfig::default()
        }
    }

    fn connected_mock() -> MockSensorTransport {
        let mut transport = MockSensorTransport::new();
        transport
            .expect_connect()
            .returning(|_| Ok(ConnectResponse { success: true }));
        transport
    }

    #[tokio::test]
    async fn test_device_capture_publishes_normalized_identifier() {
        let mut transport = connected_mock();
        transport.expect_capture().times(1).returning(|request| {
            assert_eq!(request.device_type, "MFS110");
            assert_eq!(request.quality, "high");
            Ok(CaptureResponse {
                success: true,
                fingerprint_data: Some(json!({"template": "TPL-1"})),
                message: None,
            })
        });

        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        let mut events = sensor.subscribe();

        let id = sensor.capture().await.unwrap();
        assert_eq!(id.as_str(), "TPL-1");
        assert_eq!(sensor.state(), SensorState::Captured);
        assert_eq!(sensor.identifier(), Some(id.clone()));
        assert!(!sensor.is_capturing());

        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Captured {
                identifier: id,
                source: CaptureSource::Device
            }
        );
    }

    #[tokio::test]
    async fn test_connect_failure_falls_back_to_simulation() {
        let mut transport = MockSensorTransport::new();
        transport
            .expect_connect()
            .returning(|_| Err(SensorError::Unreachable("connection refused".into())));
        transport.expect_capture().never();

        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        let mut events = sensor.subscribe();

        let id = sensor.capture().await.unwrap();
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(sensor.mode(), SensorMode::Simulation);
        assert!(matches!(
            events.recv().await.unwrap(),
            CaptureEvent::Captured {
                source: CaptureSource::Simulated,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_http_error_during_capture_falls_back() {
        let mut transport = connected_mock();
        transport
            .expect_capture()
            .returning(|_| Err(SensorError::Status(503)));

        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        let id = sensor.capture().await.unwrap();

        assert_eq!(id.as_str().len(), 64);
        assert!(!sensor.is_connected());
    }

    #[tokio::test]
    async fn test_service_reported_failure_does_not_fall_back() {
        let mut transport = connected_mock();
        transport.expect_capture().returning(|_| {
            Ok(CaptureResponse {
                success: false,
                fingerprint_data: None,
                message: Some("No finger detected".into()),
            })
        });

        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        let mut events = sensor.subscribe();

        let err = sensor.capture().await.unwrap_err();
        assert_eq!(err, SensorError::Rejected("No finger detected".into()));
        assert_eq!(sensor.state(), SensorState::Failed);
        assert!(sensor.identifier().is_none());

        match events.recv().await.unwrap() {
            CaptureEvent::Failed { reason } => assert!(reason.contains("No finger detected")),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_payload_counts_as_failure() {
        let mut transport = connected_mock();
        transport.expect_capture().returning(|_| {
            Ok(CaptureResponse {
                success: true,
                fingerprint_data: Some(json!("")),
                message: None,
            })
        });

        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        assert_eq!(
            sensor.capture().await.unwrap_err(),
            SensorError::Rejected(DEFAULT_REJECTION.into())
        );
    }

    struct StalledTransport;

    #[async_trait]
    impl SensorTransport for StalledTransport {
        async fn status(&self) -> Result<(), SensorError> {
            Ok(())
        }
        async fn connect(&self, _: &ConnectRequest) -> Result<ConnectResponse, SensorError> {
            Ok(ConnectResponse { success: true })
        }
        async fn capture(&self, _: &CaptureRequest) -> Result<CaptureResponse, SensorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(SensorError::Timeout)
        }
        async fn disconnect(&self) -> Result<(), SensorError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_capture_timeout_reports_failure() {
        let sensor = SensorClient::new(Arc::new(StalledTransport), fast_config());
        let err = sensor
            .capture_with_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();

        assert_eq!(err, SensorError::Timeout);
        assert_eq!(sensor.state(), SensorState::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_capture_is_rejected() {
        let sensor = Arc::new(SensorClient::new(Arc::new(StalledTransport), fast_config()));

        let first = {
            let sensor = sensor.clone();
            tokio::spawn(async move { sensor.capture_with_timeout(Duration::from_millis(300)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sensor.is_capturing());

        assert_eq!(
            sensor.capture().await.unwrap_err(),
            SensorError::CaptureInProgress
        );

        assert_eq!(first.await.unwrap().unwrap_err(), SensorError::Timeout);
        assert!(!sensor.is_capturing());
    }

    #[tokio::test]
    async fn test_clear_and_disconnect() {
        let mut transport = connected_mock();
        transport.expect_capture().returning(|_| {
            Ok(CaptureResponse {
                success: true,
                fingerprint_data: Some(json!("RAW")),
                message: None,
            })
        });
        transport.expect_disconnect().times(1).returning(|| Err(SensorError::Status(500)));

        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        sensor.capture().await.unwrap();

        sensor.clear();
        sensor.clear();
        assert!(sensor.identifier().is_none());
        assert_eq!(sensor.state(), SensorState::Connected);

        sensor.disconnect().await;
        assert_eq!(sensor.state(), SensorState::Disconnected);
        assert!(!sensor.is_connected());

        // already disconnected: no second notify
        sensor.disconnect().await;
    }

    #[tokio::test]
    async fn test_probe_sets_mode() {
        let mut transport = MockSensorTransport::new();
        transport.expect_status().times(1).returning(|| Ok(()));
        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        assert!(sensor.probe().await);
        assert_eq!(sensor.state(), SensorState::Connected);

        let mut transport = MockSensorTransport::new();
        transport
            .expect_status()
            .returning(|| Err(SensorError::Unreachable("refused".into())));
        let sensor = SensorClient::new(Arc::new(transport), fast_config());
        assert!(!sensor.probe().await);
        assert!(!sensor.test_connection().await);
        assert_eq!(sensor.mode(), SensorMode::Simulation);
    }
}

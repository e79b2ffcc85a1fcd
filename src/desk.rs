// src/desk.rs
//! One front-desk session: a single sensor shared by registration and lookup.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    client::{HttpPatientApi, PatientApi},
    flows::{LookupFlow, RegistrationFlow},
    sensor::{SensorClient, SensorMode},
    utils::{
        config::Config,
        error::{ClinicError, Result},
    },
};

pub struct FrontDesk {
    sensor: Arc<SensorClient>,
    registration: RegistrationFlow,
    lookup: LookupFlow,
}

impl FrontDesk {
    pub fn new(sensor: Arc<SensorClient>, api: Arc<dyn PatientApi>, recent_limit: usize) -> Self {
        Self {
            registration: RegistrationFlow::new(sensor.clone(), api.clone()),
            lookup: LookupFlow::with_recent_limit(sensor.clone(), api, recent_limit),
            sensor,
        }
    }

    /// Desk talking to the configured sensor endpoint and REST server.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sensor = SensorClient::from_config(&config.sensor)
            .map_err(|e| ClinicError::Sensor(e.to_string()))?;
        let api = HttpPatientApi::new(&config.desk.api_base_url);

        Ok(Self::new(
            Arc::new(sensor),
            Arc::new(api),
            config.desk.recent_limit,
        ))
    }

    /// Probes the sensor and fills the recent-patients list.
    pub async fn start(&mut self) {
        if !self.sensor.probe().await {
            warn!("Front desk running with simulated fingerprint captures");
        }

        if let Err(e) = self.lookup.load_recent_patients().await {
            warn!("Recent patients unavailable: {}", e);
        }

        info!(
            mode = ?self.sensor.mode(),
            "Front desk ready"
        );
    }

    pub fn sensor(&self) -> &Arc<SensorClient> {
        &self.sensor
    }

    pub fn is_simulated(&self) -> bool {
        self.sensor.mode() == SensorMode::Simulation
    }

    pub fn registration(&mut self) -> &mut RegistrationFlow {
        &mut self.registration
    }

    pub fn lookup(&mut self) -> &mut LookupFlow {
        &mut self.lookup
    }

    pub async fn shutdown(&self) {
        self.sensor.disconnect().await;
        info!("Front desk closed");
    }
}

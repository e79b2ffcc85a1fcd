// src/flows/lookup.rs
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{FlowError, Notification};
use crate::client::PatientApi;
use crate::core::identity::types::{BiometricIdentifier, PatientRecord};
use crate::sensor::{CaptureEvent, SensorClient, SensorError};

pub const DEFAULT_RECENT_LIMIT: usize = 6;

/// What the lookup screen shows; exactly one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupView {
    ScanPrompt,
    PatientFound(PatientRecord),
    NotFound,
}

pub struct LookupFlow {
    sensor: Arc<SensorClient>,
    api: Arc<dyn PatientApi>,
    events: broadcast::Receiver<CaptureEvent>,
    view: LookupView,
    recent: Vec<PatientRecord>,
    recent_limit: usize,
    notifications: Vec<Notification>,
}

impl LookupFlow {
    pub fn new(sensor: Arc<SensorClient>, api: Arc<dyn PatientApi>) -> Self {
        Self::with_recent_limit(sensor, api, DEFAULT_RECENT_LIMIT)
    }

    pub fn with_recent_limit(
        sensor: Arc<SensorClient>,
        api: Arc<dyn PatientApi>,
        recent_limit: usize,
    ) -> Self {
        let events = sensor.subscribe();
        Self {
            sensor,
            api,
            events,
            view: LookupView::ScanPrompt,
            recent: Vec::new(),
            recent_limit,
            notifications: Vec::new(),
        }
    }

    pub fn view(&self) -> &LookupView {
        &self.view
    }

    pub fn current_patient(&self) -> Option<&PatientRecord> {
        match &self.view {
            LookupView::PatientFound(patient) => Some(patient),
            _ => None,
        }
    }

    pub fn recent_patients(&self) -> &[PatientRecord] {
        &self.recent
    }

    /// Captures on the shared sensor and searches with whatever identifier
    /// the sensor published.
    pub async fn scan_fingerprint(&mut self) -> Result<Option<PatientRecord>, FlowError> {
        let result = self.sensor.capture().await;

        if let Err(SensorError::CaptureInProgress) = &result {
            self.notify(Notification::error(format!(
                "Error scanning fingerprint: {}",
                SensorError::CaptureInProgress
            )));
        }

        let synced = self.sync_events().await;
        result?;
        synced?;
        Ok(self.current_patient().cloned())
    }

    /// Applies every pending capture event; the last failed search, if any,
    /// is returned once the queue is drained.
    pub async fn sync_events(&mut self) -> Result<(), FlowError> {
        let mut outcome = Ok(());
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if let Err(e) = self.apply_event(event).await {
                        outcome = Err(e);
                    }
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Lookup flow missed {} capture events", missed)
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        outcome
    }

    pub async fn apply_event(&mut self, event: CaptureEvent) -> Result<(), FlowError> {
        match event {
            CaptureEvent::Captured { identifier, .. } => {
                self.search_patient(&identifier).await?;
            }
            CaptureEvent::Failed { reason } => {
                self.notify(Notification::error(format!(
                    "Fingerprint scan failed: {}",
                    reason
                )));
            }
        }
        Ok(())
    }

    /// A miss is an ordinary outcome, not an error.
    pub async fn search_patient(
        &mut self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>, FlowError> {
        self.notify(Notification::info("Searching for patient..."));

        match self.api.scan(identifier).await {
            Ok(Some(patient)) => {
                info!("Found patient #{}", patient.short_id());
                self.view = LookupView::PatientFound(patient.clone());
                self.notify(Notification::success("Patient found!"));
                Ok(Some(patient))
            }
            Ok(None) => {
                self.view = LookupView::NotFound;
                self.notify(Notification::error("Patient not found in database."));
                Ok(None)
            }
            Err(e) => {
                error!("Error searching for patient: {}", e);
                self.view = LookupView::ScanPrompt;
                self.notify(Notification::error(
                    "Error searching for patient. Please try again.",
                ));
                Err(e.into())
            }
        }
    }

    pub fn clear_scan(&mut self) {
        self.sensor.clear();
        self.view = LookupView::ScanPrompt;
    }

    /// Refreshes the newest registrations shown next to the scanner.
    pub async fn load_recent_patients(&mut self) -> Result<&[PatientRecord], FlowError> {
        let mut patients = self.api.list().await.map_err(|e| {
            error!("Error loading recent patients: {}", e);
            e
        })?;

        patients.truncate(self.recent_limit);
        self.recent = patients;
        Ok(self.recent.as_slice())
    }

    pub async fn select_patient(&mut self, id: &Uuid) -> Result<Option<PatientRecord>, FlowError> {
        match self.api.get(id).await {
            Ok(Some(patient)) => {
                self.view = LookupView::PatientFound(patient.clone());
                self.notify(Notification::info("Patient selected from recent list."));
                Ok(Some(patient))
            }
            Ok(None) => {
                warn!("Selected patient {} no longer exists", id);
                Ok(None)
            }
            Err(e) => {
                error!("Error selecting patient: {}", e);
                self.notify(Notification::error("Error selecting patient."));
                Err(e.into())
            }
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

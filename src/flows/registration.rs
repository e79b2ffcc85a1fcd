// src/flows/registration.rs
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, info, warn};

use super::{FlowError, Notification};
use crate::client::{ClientError, PatientApi};
use crate::core::identity::{
    types::{BiometricIdentifier, DocumentUpload, PatientRecord, RegistrationRequest},
    validation::{validate_field, validate_registration, Field, FieldError, ValidationErrors},
};
use crate::sensor::{CaptureEvent, SensorClient, SensorError};

/// Raw text of the registration inputs as typed at the desk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub blood_group: String,
}

impl RegistrationForm {
    fn value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(&self.name),
            Field::Age => Some(&self.age),
            Field::Gender => Some(&self.gender),
            Field::BloodGroup => Some(&self.blood_group),
            Field::FingerprintData => None,
        }
    }
}

pub struct RegistrationFlow {
    sensor: Arc<SensorClient>,
    api: Arc<dyn PatientApi>,
    events: broadcast::Receiver<CaptureEvent>,
    form: RegistrationForm,
    document: Option<DocumentUpload>,
    fingerprint: Option<BiometricIdentifier>,
    field_errors: HashMap<Field, FieldError>,
    notifications: Vec<Notification>,
}

impl RegistrationFlow {
    pub fn new(sensor: Arc<SensorClient>, api: Arc<dyn PatientApi>) -> Self {
        let events = sensor.subscribe();
        Self {
            sensor,
            api,
            events,
            form: RegistrationForm::default(),
            document: None,
            fingerprint: None,
            field_errors: HashMap::new(),
            notifications: Vec::new(),
        }
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn document(&self) -> Option<&DocumentUpload> {
        self.document.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&BiometricIdentifier> {
        self.fingerprint.as_ref()
    }

    pub fn field_error(&self, field: Field) -> Option<&FieldError> {
        self.field_errors.get(&field)
    }

    /// Updates one input and re-checks it. The fingerprint is only ever
    /// set by a capture.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Option<FieldError> {
        let value = value.into();
        match field {
            Field::Name => self.form.name = value,
            Field::Age => self.form.age = value,
            Field::Gender => self.form.gender = value,
            Field::BloodGroup => self.form.blood_group = value,
            Field::FingerprintData => {
                warn!("Fingerprint data can only be set by a capture");
                return self.validate_field(field);
            }
        }
        self.validate_field(field)
    }

    pub fn attach_document(&mut self, document: DocumentUpload) {
        info!("Attached document {}", document.file_name);
        self.document = Some(document);
    }

    pub fn detach_document(&mut self) {
        self.document = None;
    }

    pub fn validate_field(&mut self, field: Field) -> Option<FieldError> {
        let value = match self.form.value(field) {
            Some(value) => value,
            None => self.fingerprint.as_ref().map_or("", |id| id.as_str()),
        };

        let result = validate_field(field, value);
        match &result {
            Some(error) => self.field_errors.insert(field, error.clone()),
            None => self.field_errors.remove(&field),
        };
        result
    }

    /// Checks every input plus the captured identifier; `Ok` means submit
    /// is enabled.
    pub fn validate_form(&mut self) -> Result<(), ValidationErrors> {
        let result = validate_registration(&self.request()).map(|_| ());

        self.field_errors.clear();
        if let Err(errors) = &result {
            for error in &errors.errors {
                self.field_errors.insert(error.field, error.clone());
            }
        }
        result
    }

    pub fn can_submit(&self) -> bool {
        validate_registration(&self.request()).is_ok()
    }

    /// Runs one capture on the shared sensor, then applies whatever the
    /// sensor published.
    pub async fn capture_fingerprint(&mut self) -> Result<BiometricIdentifier, FlowError> {
        let result = self.sensor.capture().await;

        if let Err(SensorError::CaptureInProgress) = &result {
            self.notify(Notification::error(format!(
                "Error capturing fingerprint: {}",
                SensorError::CaptureInProgress
            )));
        }

        self.sync_events();
        Ok(result?)
    }

    /// Applies capture events published since the last call, including
    /// ones triggered from another flow.
    pub fn sync_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Registration flow missed {} capture events", missed)
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    pub fn apply_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Captured { identifier, .. } => {
                self.fingerprint = Some(identifier);
                self.field_errors.remove(&Field::FingerprintData);
                self.notify(Notification::success("Fingerprint captured successfully!"));
            }
            CaptureEvent::Failed { reason } => {
                self.fingerprint = None;
                self.notify(Notification::error(format!(
                    "Fingerprint capture failed: {}",
                    reason
                )));
            }
        }
    }

    pub fn clear_fingerprint(&mut self) {
        self.sensor.clear();
        self.fingerprint = None;
    }

    pub async fn submit(&mut self) -> Result<PatientRecord, FlowError> {
        if let Err(errors) = self.validate_form() {
            let err = FlowError::Incomplete(errors);
            self.notify(Notification::error(err.to_string()));
            return Err(err);
        }

        let mut request = self.request();
        request.document = self.document.clone();

        match self.api.register(request).await {
            Ok(patient) => {
                info!("Registered patient #{}", patient.short_id());
                self.notify(Notification::success("Patient registered successfully!"));
                self.reset();
                Ok(patient)
            }
            Err(e) => {
                error!("Error submitting registration: {}", e);
                let message = match &e {
                    ClientError::Server { message, .. } => {
                        format!("Registration failed: {}", message)
                    }
                    _ => "Registration failed. Please try again.".to_string(),
                };
                self.notify(Notification::error(message));
                Err(e.into())
            }
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn request(&self) -> RegistrationRequest {
        RegistrationRequest {
            name: self.form.name.clone(),
            age: self.form.age.clone(),
            gender: self.form.gender.clone(),
            blood_group: self.form.blood_group.clone(),
            fingerprint_data: self.fingerprint.clone().unwrap_or_else(|| "".into()),
            document: None,
        }
    }

    fn reset(&mut self) {
        self.form = RegistrationForm::default();
        self.document = None;
        self.field_errors.clear();
        self.clear_fingerprint();
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPatientApi;
    use crate::flows::NotificationKind;
    use crate::sensor::{CaptureResponse, ConnectResponse, MockSensorTransport};
    use crate::utils::config::SensorConfig;
    use serde_json::json;

    fn sensor_returning(template: &'static str) -> Arc<SensorClient> {
        let mut transport = MockSensorTransport::new();
        transport
            .expect_connect()
            .returning(|_| Ok(ConnectResponse { success: true }));
        transport.expect_capture().returning(move |_| {
            Ok(CaptureResponse {
                success: true,
                fingerprint_data: Some(json!({ "template": template })),
                message: None,
            })
        });
        transport.expect_disconnect().returning(|| Ok(()));

        Arc::new(SensorClient::new(
            Arc::new(transport),
            SensorConfig {
                simulation_delay_ms: 0,
                ..SensorConfig::default()
            },
        ))
    }

    fn fill(flow: &mut RegistrationFlow) {
        flow.set_field(Field::Name, "Kofi Mensah");
        flow.set_field(Field::Age, "61");
        flow.set_field(Field::Gender, "Male");
        flow.set_field(Field::BloodGroup, "B+");
    }

    #[tokio::test]
    async fn test_submit_is_gated_until_complete() {
        let mut api = MockPatientApi::new();
        api.expect_register().never();

        let mut flow = RegistrationFlow::new(sensor_returning("A1"), Arc::new(api));
        fill(&mut flow);
        flow.set_field(Field::Gender, "");

        assert!(!flow.can_submit());
        let err = flow.submit().await.unwrap_err();
        match err {
            FlowError::Incomplete(errors) => {
                assert!(errors.for_field(Field::Gender).is_some());
                assert!(errors.for_field(Field::FingerprintData).is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            flow.take_notifications(),
            vec![Notification::error(
                "Please fill all required fields and capture fingerprint."
            )]
        );
    }

    #[tokio::test]
    async fn test_capture_then_submit_resets_form() {
        let mut api = MockPatientApi::new();
        api.expect_register().times(1).returning(|request| {
            assert_eq!(request.fingerprint_data.as_str(), "A1");
            assert_eq!(request.document.as_ref().unwrap().file_name, "ecg.pdf");
            let patient = validate_registration(&request).unwrap();
            Ok(PatientRecord::create(patient))
        });

        let sensor = sensor_returning("A1");
        let mut flow = RegistrationFlow::new(sensor.clone(), Arc::new(api));
        fill(&mut flow);
        flow.attach_document(DocumentUpload {
            file_name: "ecg.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: vec![1, 2, 3],
        });
        assert!(!flow.can_submit());

        flow.capture_fingerprint().await.unwrap();
        assert_eq!(flow.fingerprint().unwrap().as_str(), "A1");
        assert!(flow.can_submit());

        flow.submit().await.unwrap();

        assert_eq!(flow.form(), &RegistrationForm::default());
        assert!(flow.document().is_none());
        assert!(flow.fingerprint().is_none());
        assert!(sensor.identifier().is_none());

        let messages: Vec<_> = flow
            .take_notifications()
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Fingerprint captured successfully!", "Patient registered successfully!"]
        );
    }

    #[tokio::test]
    async fn test_detached_document_is_not_uploaded() {
        let mut api = MockPatientApi::new();
        api.expect_register()
            .withf(|request| request.document.is_none())
            .times(1)
            .returning(|request| Ok(PatientRecord::create(validate_registration(&request).unwrap())));

        let mut flow = RegistrationFlow::new(sensor_returning("A1"), Arc::new(api));
        fill(&mut flow);
        flow.attach_document(DocumentUpload {
            file_name: "xray.png".into(),
            content_type: Some("image/png".into()),
            bytes: vec![7; 16],
        });
        flow.detach_document();
        assert!(flow.document().is_none());

        flow.capture_fingerprint().await.unwrap();
        let patient = flow.submit().await.unwrap();
        assert!(patient.medical_document.is_none());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_form() {
        let mut api = MockPatientApi::new();
        api.expect_register().returning(|_| {
            Err(ClientError::Server {
                status: 500,
                message: "disk full".into(),
            })
        });

        let mut flow = RegistrationFlow::new(sensor_returning("A1"), Arc::new(api));
        fill(&mut flow);
        flow.capture_fingerprint().await.unwrap();
        flow.take_notifications();

        assert!(flow.submit().await.is_err());
        assert_eq!(flow.form().name, "Kofi Mensah");
        assert!(flow.fingerprint().is_some());

        let notes = flow.take_notifications();
        assert_eq!(notes[0].kind, NotificationKind::Error);
        assert_eq!(notes[0].message, "Registration failed: disk full");
    }

    #[tokio::test]
    async fn test_field_errors_track_inputs() {
        let mut flow = RegistrationFlow::new(sensor_returning("A1"), Arc::new(MockPatientApi::new()));

        let err = flow.set_field(Field::Age, "0").unwrap();
        assert_eq!(err.message, "Age must be between 1 and 120");
        assert!(flow.field_error(Field::Age).is_some());

        assert!(flow.set_field(Field::Age, "120").is_none());
        assert!(flow.field_error(Field::Age).is_none());

        let errors = flow.validate_form().unwrap_err();
        assert_eq!(errors.errors.len(), 4);
    }

    #[tokio::test]
    async fn test_failure_event_drops_fingerprint() {
        let mut flow = RegistrationFlow::new(sensor_returning("A1"), Arc::new(MockPatientApi::new()));
        flow.capture_fingerprint().await.unwrap();
        flow.take_notifications();

        flow.apply_event(CaptureEvent::Failed {
            reason: "Fingerprint capture timed out".into(),
        });
        assert!(flow.fingerprint().is_none());
        assert_eq!(
            flow.take_notifications(),
            vec![Notification::error(
                "Fingerprint capture failed: Fingerprint capture timed out"
            )]
        );
    }
}

// tests/common/mod.rs
#![allow(dead_code)]

use biodesk::{
    core::{identity::types::RegistrationRequest, services::PatientService},
    storage::{DocumentStore, MemoryPatientStore},
    utils::config::{Config, SensorConfig, StorageBackend},
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub fn sensor_config(endpoint: &str) -> SensorConfig {
    SensorConfig {
        endpoint: endpoint.to_string(),
        capture_timeout_ms: 1_000,
        simulation_delay_ms: 0,
        connect_timeout_ms: 200,
        ..SensorConfig::default()
    }
}

/// Memory-backed server config bound to an ephemeral port.
pub fn server_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.server.port = 0;
    config.storage.backend = StorageBackend::Memory;
    config.storage.uploads_dir = dir.join("uploads").to_string_lossy().into_owned();
    config.storage.max_upload_bytes = 1024 * 1024;
    config
}

pub fn in_process_service(dir: &Path) -> Arc<PatientService> {
    Arc::new(PatientService::new(
        Arc::new(MemoryPatientStore::new()),
        DocumentStore::new(dir.join("uploads"), 1024 * 1024),
    ))
}

pub fn registration(name: &str, identifier: &str) -> RegistrationRequest {
    RegistrationRequest {
        name: name.to_string(),
        age: "40".to_string(),
        gender: "Female".to_string(),
        blood_group: "A+".to_string(),
        fingerprint_data: identifier.into(),
        document: None,
    }
}

/// Address nothing is listening on.
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// RD Services stand-in that accepts connections and returns `template`
/// for every capture.
pub async fn rd_service(template: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_rd_service(&server, template).await;
    server
}

pub async fn mount_rd_service(server: &MockServer, template: &str) {
    server.reset().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ready"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "fingerprintData": {"template": template}
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/disconnect"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

// src/lib.rs
pub mod api;
pub mod client;
pub mod core;
pub mod desk;
pub mod flows;
pub mod sensor;
pub mod storage;
pub mod utils;

use actix_cors::Cors;
use actix_web::{dev::ServerHandle, web, App, HttpServer};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    core::services::patient::PatientService,
    storage::{open_store, DocumentStore},
    utils::{
        config::Config,
        error::{ClinicError, Result},
    },
};

pub use desk::FrontDesk;

/// The record server: storage, uploads directory and the REST API.
pub struct Application {
    config: Arc<Config>,
    patient_service: Arc<PatientService>,
    server: Mutex<Option<ServerHandle>>,
}

impl Application {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        info!("Initializing storage...");
        let store = open_store(&config.storage)?;

        // Uploaded documents live next to the store
        let documents = DocumentStore::new(&config.storage.uploads_dir, config.storage.max_upload_bytes);
        documents.ensure_dir().await?;

        let patient_service = Arc::new(PatientService::new(store, documents));

        Ok(Self {
            config,
            patient_service,
            server: Mutex::new(None),
        })
    }

    pub fn patient_service(&self) -> Arc<PatientService> {
        self.patient_service.clone()
    }

    /// Binds and spawns the API server; returns the first bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        info!("Starting API server...");

        let service = web::Data::from(self.patient_service.clone());
        let permissive = self.config.server.cors_permissive;

        let server = HttpServer::new(move || {
            App::new()
                .wrap(cors(permissive))
                .app_data(service.clone())
                .service(api::handlers::patients::scope())
        })
        .bind((self.config.server.host.as_str(), self.config.server.port))
        .map_err(|e| ClinicError::Server(format!("Failed to bind API server: {}", e)))?;

        // Port 0 binds an ephemeral port; report the real one
        let addr = server
            .addrs()
            .first()
            .copied()
            .ok_or_else(|| ClinicError::Server("API server bound no address".into()))?;

        // Keep the handle for graceful shutdown
        let server = server.run();
        *self.server.lock() = Some(server.handle());

        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("API server stopped with error: {}", e);
            }
        });

        info!("Server running on http://{}", addr);
        Ok(addr)
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        // Stop accepting requests, then drain in-flight ones
        let handle = self.server.lock().take();
        if let Some(handle) = handle {
            handle.stop(true).await;
        }

        info!("Closing storage...");
        self.patient_service.close().await?;

        info!("Application shutdown complete");
        Ok(())
    }
}

fn cors(permissive: bool) -> Cors {
    if permissive {
        Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allow_any_header()
    } else {
        Cors::default()
    }
}

// src/api/handlers/patients.rs
use actix_multipart::Multipart;
use actix_web::{
    web::{self, Data, Json, Path},
    HttpResponse, Scope,
};
use futures::TryStreamExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    api::{
        types::{
            PatientListResponse, PatientResponse, ScanRequest, NOT_FOUND_MESSAGE,
            REGISTERED_MESSAGE,
        },
        ApiError,
    },
    core::{
        identity::types::{BiometricIdentifier, DocumentUpload, RegistrationRequest},
        services::patient::PatientService,
    },
    storage::StorageError,
    utils::error::ClinicError,
};

const DOCUMENT_FIELD: &str = "medicalDocument";

pub fn scope() -> Scope {
    web::scope("/api/patients")
        .app_data(json_config())
        .service(
            web::resource("")
                .route(web::post().to(register_patient))
                .route(web::get().to(list_patients)),
        )
        .service(web::resource("/scan").route(web::post().to(scan_patient)))
        .service(web::resource("/{id}").route(web::get().to(get_patient)))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _| ApiError::BadRequest(format!("Invalid request body: {}", err)).into())
}

async fn register_patient(
    service: Data<PatientService>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    info!("Received patient registration request");

    let limit = service.documents().max_bytes();
    let request = read_registration(payload, limit).await.map_err(|e| {
        error!("Failed to read registration form: {}", e);
        e
    })?;

    let patient = service.register(request).await.map_err(|e| {
        error!("Error registering patient: {}", e);
        ApiError::from(e)
    })?;

    Ok(HttpResponse::Created().json(PatientResponse::with_message(patient, REGISTERED_MESSAGE)))
}

async fn scan_patient(
    service: Data<PatientService>,
    request: Json<ScanRequest>,
) -> Result<HttpResponse, ApiError> {
    if request.fingerprint_data.is_empty() {
        return Err(ApiError::BadRequest("Fingerprint data is required".into()));
    }

    let identifier: BiometricIdentifier = request.into_inner().fingerprint_data.into();
    let patient = service
        .scan(&identifier)
        .await
        .map_err(|e| {
            error!("Error scanning fingerprint: {}", e);
            ApiError::from(e)
        })?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND_MESSAGE.into()))?;

    Ok(HttpResponse::Ok().json(PatientResponse::ok(patient)))
}

async fn list_patients(service: Data<PatientService>) -> Result<HttpResponse, ApiError> {
    let patients = service.list().await.map_err(|e| {
        error!("Error fetching patients: {}", e);
        ApiError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(PatientListResponse {
        success: true,
        patients,
    }))
}

async fn get_patient(
    service: Data<PatientService>,
    id: Path<String>,
) -> Result<HttpResponse, ApiError> {
    // a malformed id cannot name any record
    let Ok(id) = Uuid::parse_str(&id) else {
        warn!("Rejected malformed patient id {}", id);
        return Err(ApiError::NotFound(NOT_FOUND_MESSAGE.into()));
    };

    let patient = service
        .get(&id)
        .await
        .map_err(|e| {
            error!("Failed to retrieve patient {}: {}", id, e);
            ApiError::from(e)
        })?
        .ok_or_else(|| {
            warn!("Patient {} not found", id);
            ApiError::NotFound(NOT_FOUND_MESSAGE.into())
        })?;

    Ok(HttpResponse::Ok().json(PatientResponse::ok(patient)))
}

/// Collects the registration form. Unknown parts are drained and dropped;
/// an empty file part counts as no document.
async fn read_registration(
    mut payload: Multipart,
    limit: usize,
) -> Result<RegistrationRequest, ApiError> {
    let mut request = RegistrationRequest {
        name: String::new(),
        age: String::new(),
        gender: String::new(),
        blood_group: String::new(),
        fingerprint_data: String::new().into(),
        document: None,
    };

    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(ClinicError::Storage(StorageError::DocumentTooLarge {
                    size: bytes.len() + chunk.len(),
                    limit,
                })
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }

        if name == DOCUMENT_FIELD {
            let file_name = disposition.get_filename().unwrap_or_default().to_string();
            if !file_name.is_empty() || !bytes.is_empty() {
                request.document = Some(DocumentUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = String::from_utf8_lossy(&bytes).into_owned();
        match name.as_str() {
            "name" => request.name = value,
            "age" => request.age = value,
            "gender" => request.gender = value,
            "bloodGroup" => request.blood_group = value,
            "fingerprintData" => request.fingerprint_data = value.into(),
            other => warn!("Ignoring unexpected form field {:?}", other),
        }
    }

    Ok(request)
}

// src/core/identity/validation.rs
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::types::{BloodGroup, Gender, NewPatient, RegistrationRequest};

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 120;
pub const MIN_NAME_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Age,
    Gender,
    BloodGroup,
    FingerprintData,
}

impl Field {
    pub const REQUIRED: [Field; 4] = [Field::Name, Field::Age, Field::Gender, Field::BloodGroup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Age => "age",
            Field::Gender => "gender",
            Field::BloodGroup => "bloodGroup",
            Field::FingerprintData => "fingerprintData",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

pub fn validate_name(value: &str) -> Result<String, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(Field::Name, "Name is required"));
    }
    if value.chars().count() < MIN_NAME_CHARS {
        return Err(FieldError::new(Field::Name, "Name must be at least 2 characters"));
    }
    Ok(value.to_string())
}

pub fn validate_age(value: &str) -> Result<u8, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(Field::Age, "Age is required"));
    }
    value
        .parse::<i64>()
        .ok()
        .filter(|age| (i64::from(MIN_AGE)..=i64::from(MAX_AGE)).contains(age))
        .map(|age| age as u8)
        .ok_or_else(|| FieldError::new(Field::Age, "Age must be between 1 and 120"))
}

pub fn validate_gender(value: &str) -> Result<Gender, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::new(Field::Gender, "Gender is required"))
}

pub fn validate_blood_group(value: &str) -> Result<BloodGroup, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::new(Field::BloodGroup, "Blood group is required"))
}

pub fn validate_fingerprint(value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::new(
            Field::FingerprintData,
            "Fingerprint data is required",
        ));
    }
    Ok(())
}

/// Checks one field by its wire name; returns the field error, if any.
pub fn validate_field(field: Field, value: &str) -> Option<FieldError> {
    match field {
        Field::Name => validate_name(value).err(),
        Field::Age => validate_age(value).err(),
        Field::Gender => validate_gender(value).err(),
        Field::BloodGroup => validate_blood_group(value).err(),
        Field::FingerprintData => validate_fingerprint(value).err(),
    }
}

/// Validates every field of a registration and builds the record payload.
/// The document reference is filled in by the caller once stored.
pub fn validate_registration(request: &RegistrationRequest) -> Result<NewPatient, ValidationErrors> {
    let mut errors = Vec::new();

    let name = validate_name(&request.name).map_err(|e| errors.push(e)).ok();
    let age = validate_age(&request.age).map_err(|e| errors.push(e)).ok();
    let gender = validate_gender(&request.gender).map_err(|e| errors.push(e)).ok();
    let blood_group = validate_blood_group(&request.blood_group)
        .map_err(|e| errors.push(e))
        .ok();
    if let Err(e) = validate_fingerprint(request.fingerprint_data.as_str()) {
        errors.push(e);
    }

    match (name, age, gender, blood_group) {
        (Some(name), Some(age), Some(gender), Some(blood_group)) if errors.is_empty() => {
            Ok(NewPatient {
                name,
                age,
                gender,
                blood_group,
                medical_document: None,
                fingerprint_data: request.fingerprint_data.clone(),
            })
        }
        _ => Err(ValidationErrors { errors }),
    }
}

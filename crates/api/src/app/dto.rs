use chrono::NaiveDate;
use serde::Deserialize;

use bloodbank_core::{DomainError, DomainResult};

// -------------------------
// Request DTOs
// -------------------------
//
// Required fields are `Option` so a missing value produces the endpoint's own
// validation message instead of a generic deserialization error.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub blood_group: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBloodRequest {
    pub requester_id: Option<i64>,
    pub patient_name: Option<String>,
    pub blood_group: Option<String>,
    pub units_required: Option<i64>,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub urgency_level: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub reason: Option<String>,
    pub required_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleDonationRequest {
    pub donor_id: Option<i64>,
    pub request_id: Option<i64>,
    pub donation_date: Option<NaiveDate>,
    pub blood_group: Option<String>,
    pub units_donated: Option<i64>,
    pub donation_center: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteDonationRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactSubmitRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnitsRequest {
    pub blood_group: Option<String>,
    pub units: Option<i64>,
}

/// Body of both the administrative update and initialization.
#[derive(Debug, Deserialize)]
pub struct CountsRequest {
    pub blood_group: Option<String>,
    pub available_units: Option<i64>,
    pub reserved_units: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<u32>,
}

// -------------------------
// Field helpers
// -------------------------

/// A present, non-blank string.
pub fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Convert a JSON count into `u32`; negative values are rejected.
pub fn count(value: i64, field: &str) -> DomainResult<u32> {
    u32::try_from(value).map_err(|_| DomainError::validation(format!("{field} must be a non-negative integer")))
}

/// Like [`count`] but zero is rejected too.
pub fn positive_units(value: i64, field: &str) -> DomainResult<u32> {
    match count(value, field) {
        Ok(0) | Err(_) => Err(DomainError::validation(format!("{field} must be a positive integer"))),
        Ok(units) => Ok(units),
    }
}

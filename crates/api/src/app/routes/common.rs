use axum::{
    extract::{Path, rejection::PathRejection},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use bloodbank_core::BloodGroup;

use crate::app::errors;

/// `{success: true, message}`.
pub fn message(message: impl Into<String>) -> axum::response::Response {
    Json(json!({
        "success": true,
        "message": message.into(),
    }))
    .into_response()
}

/// Numeric id from the path, or a 400 envelope.
pub fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, axum::response::Response> {
    path.map(|Path(id)| id).map_err(errors::path_rejection)
}

/// Blood group from an (already percent-decoded) path segment.
pub fn path_blood_group(raw: &str) -> Result<BloodGroup, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bloodbank_auth::AuthError;
use bloodbank_core::{DomainError, ErrorKind};
use bloodbank_infra::config::Environment;
use bloodbank_infra::store::StoreError;

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateConflict => StatusCode::BAD_REQUEST,
    };
    json_error(status, err.to_string())
}

pub fn store_error_to_response(err: StoreError, environment: Environment) -> axum::response::Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        other => internal_error(other, environment),
    }
}

pub fn auth_error_to_response(err: AuthError, environment: Environment) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials(source) => {
            tracing::info!(reason = %source, "login rejected");
            json_error(StatusCode::UNAUTHORIZED, "Invalid email or password")
        }
        AuthError::UnexpectedError(source) => internal_error(source, environment),
    }
}

/// Log the failure and answer 500. The detail only reaches the client in development.
pub fn internal_error(err: impl std::fmt::Display, environment: Environment) -> axum::response::Response {
    let detail = err.to_string();
    tracing::error!(error = %detail, "request failed");

    let mut body = json!({
        "success": false,
        "message": "Internal server error",
    });
    if environment.exposes_error_details() {
        body["error"] = json!(detail);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}

pub fn json_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", rejection.body_text()))
}

pub fn path_rejection(rejection: PathRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, format!("Invalid path parameter: {}", rejection.body_text()))
}

pub fn query_rejection(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, format!("Invalid query string: {}", rejection.body_text()))
}

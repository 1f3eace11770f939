use std::sync::Arc;

use axum::{
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use bloodbank_core::{BloodGroup, DomainResult, RequestId, UserId};
use bloodbank_directory::{BloodRequestView, NewBloodRequest, RequestStatus, UrgencyLevel};
use bloodbank_infra::store::StoreResult;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

use super::common;

pub fn router() -> Router {
    Router::new()
        .route("/create", post(create_request))
        .route("/all", get(list_requests))
        .route("/by-blood-group/:blood_group", get(by_blood_group))
        .route("/by-location", get(by_location))
        .route("/urgent/all", get(urgent_requests))
        .route("/:id", get(get_request).delete(delete_request))
        .route("/:id/status", put(update_status))
}

fn requests_response(services: &AppServices, result: StoreResult<Vec<BloodRequestView>>) -> axum::response::Response {
    match result {
        Ok(requests) => Json(json!({ "success": true, "requests": requests })).into_response(),
        Err(e) => services.store_error(e),
    }
}

fn parse_request_fields(
    blood_group: &str,
    units_required: i64,
    urgency_level: Option<String>,
) -> DomainResult<(BloodGroup, u32, UrgencyLevel)> {
    let urgency_level = match dto::required(urgency_level) {
        Some(raw) => raw.parse()?,
        None => UrgencyLevel::default(),
    };
    Ok((
        blood_group.parse()?,
        dto::positive_units(units_required, "units_required")?,
        urgency_level,
    ))
}

pub async fn create_request(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateBloodRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(patient_name), Some(blood_group), Some(units_required)) = (
        dto::required(body.patient_name),
        dto::required(body.blood_group),
        body.units_required,
    ) else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "Patient name, blood group, and units required are mandatory",
        );
    };

    let parsed = parse_request_fields(&blood_group, units_required, body.urgency_level);
    let (blood_group, units_required, urgency_level) = match parsed {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let new = NewBloodRequest {
        requester_id: body.requester_id.map(UserId::new),
        patient_name,
        blood_group,
        units_required,
        hospital_name: body.hospital_name,
        hospital_address: body.hospital_address,
        urgency_level,
        contact_person: body.contact_person,
        contact_phone: body.contact_phone,
        reason: body.reason,
        required_date: body.required_date,
    };
    match services.requests.create(new).await {
        Ok(request) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Blood request created successfully",
                "request_id": request.id,
            })),
        )
            .into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn list_requests(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let result = services.requests.list_all().await;
    requests_response(&services, result)
}

pub async fn by_blood_group(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw): Path<String>,
) -> axum::response::Response {
    let blood_group = match common::path_blood_group(&raw) {
        Ok(g) => g,
        Err(response) => return response,
    };
    let result = services.requests.pending_by_blood_group(blood_group).await;
    requests_response(&services, result)
}

pub async fn by_location(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::LocationQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::query_rejection(e),
    };
    let result = services
        .requests
        .pending_by_location(dto::required(query.city), dto::required(query.state))
        .await;
    requests_response(&services, result)
}

pub async fn urgent_requests(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let result = services.requests.urgent().await;
    requests_response(&services, result)
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.requests.get(RequestId::new(id)).await {
        Ok(request) => Json(json!({ "success": true, "request": request })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<dto::UpdateStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let Some(raw) = dto::required(body.status) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Status is required");
    };
    let status: RequestStatus = match raw.parse() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.requests.update_status(RequestId::new(id), status).await {
        Ok(()) => {
            tracing::info!(request_id = id, status = status.as_str(), "blood request status changed");
            common::message("Blood request status updated successfully")
        }
        Err(e) => services.store_error(e),
    }
}

pub async fn delete_request(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.requests.delete(RequestId::new(id)).await {
        Ok(()) => common::message("Blood request deleted successfully"),
        Err(e) => services.store_error(e),
    }
}

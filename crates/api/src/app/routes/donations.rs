use std::sync::Arc;

use axum::{
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use bloodbank_core::{BloodGroup, DonationId, RequestId, UserId};
use bloodbank_donations::{DonationView, ScheduleDonation};
use bloodbank_infra::store::StoreResult;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

use super::common;

pub fn router() -> Router {
    Router::new()
        .route("/schedule", post(schedule_donation))
        .route("/:id/complete", put(complete_donation))
        .route("/:id/cancel", put(cancel_donation))
        .route("/all", get(list_donations))
        .route("/donor/:donor_id", get(by_donor))
        .route("/by-blood-group/:blood_group", get(by_blood_group))
        .route("/statistics", get(statistics))
}

fn donations_response(services: &AppServices, result: StoreResult<Vec<DonationView>>) -> axum::response::Response {
    match result {
        Ok(donations) => Json(json!({ "success": true, "donations": donations })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn schedule_donation(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ScheduleDonationRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(donor_id), Some(donation_date), Some(blood_group)) =
        (body.donor_id, body.donation_date, dto::required(body.blood_group))
    else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "Donor ID, donation date, and blood group are required",
        );
    };

    let parsed = blood_group
        .parse::<BloodGroup>()
        .and_then(|g| Ok((g, dto::positive_units(body.units_donated.unwrap_or(1), "units_donated")?)));
    let (blood_group, units_donated) = match parsed {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let cmd = ScheduleDonation {
        donor_id: UserId::new(donor_id),
        request_id: body.request_id.map(RequestId::new),
        donation_date,
        blood_group,
        units_donated,
        donation_center: body.donation_center,
        notes: body.notes,
    };
    match services.donations.schedule(cmd, services.config.mismatch_policy).await {
        Ok(donation) => {
            tracing::info!(
                donation_id = %donation.id,
                donor_id = %donation.donor_id,
                blood_group = %donation.blood_group,
                "donation scheduled"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "message": "Blood donation scheduled successfully",
                    "donation_id": donation.id,
                })),
            )
                .into_response()
        }
        Err(e) => services.store_error(e),
    }
}

pub async fn complete_donation(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<dto::CompleteDonationRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    // The notes body is optional; anything else that fails to parse is refused.
    let body = match body {
        Ok(Json(b)) => b,
        Err(JsonRejection::MissingJsonContentType(_)) => dto::CompleteDonationRequest::default(),
        Err(e) => return errors::json_rejection(e),
    };
    let notes = bloodbank_directory::non_blank(body.notes);

    match services.donations.complete(DonationId::new(id), notes).await {
        Ok(donation) => {
            tracing::info!(
                donation_id = id,
                blood_group = %donation.blood_group,
                units = donation.units_donated,
                "donation completed, inventory credited"
            );
            common::message("Blood donation completed successfully")
        }
        Err(e) => services.store_error(e),
    }
}

pub async fn cancel_donation(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.donations.cancel(DonationId::new(id)).await {
        Ok(_) => common::message("Blood donation cancelled successfully"),
        Err(e) => services.store_error(e),
    }
}

pub async fn list_donations(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let result = services.donations.list_all().await;
    donations_response(&services, result)
}

pub async fn by_donor(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let donor_id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let result = services.donations.by_donor(UserId::new(donor_id)).await;
    donations_response(&services, result)
}

pub async fn by_blood_group(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw): Path<String>,
) -> axum::response::Response {
    let blood_group = match common::path_blood_group(&raw) {
        Ok(g) => g,
        Err(response) => return response,
    };
    let result = services.donations.completed_by_blood_group(blood_group).await;
    donations_response(&services, result)
}

pub async fn statistics(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let today = chrono::Utc::now().date_naive();
    match services.donations.statistics(today).await {
        Ok(statistics) => Json(json!({ "success": true, "statistics": statistics })).into_response(),
        Err(e) => services.store_error(e),
    }
}

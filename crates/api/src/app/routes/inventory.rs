use std::sync::Arc;

use axum::{
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use bloodbank_core::BloodGroup;
use bloodbank_infra::store::InventoryLedger;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

use super::common;

pub fn router() -> Router {
    Router::new()
        .route("/all", get(list_inventory))
        .route("/blood-group/:blood_group", get(get_blood_group))
        .route("/update", put(update_counts))
        .route("/add", post(add_units))
        .route("/reserve", post(reserve_units))
        .route("/release", post(release_units))
        .route("/low-stock", get(low_stock))
        .route("/statistics", get(statistics))
        .route("/initialize", post(initialize))
}

pub async fn list_inventory(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.list().await {
        Ok(inventory) => Json(json!({ "success": true, "inventory": inventory })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn get_blood_group(
    Extension(services): Extension<Arc<AppServices>>,
    Path(raw): Path<String>,
) -> axum::response::Response {
    let blood_group = match common::path_blood_group(&raw) {
        Ok(g) => g,
        Err(response) => return response,
    };
    match services.ledger.get(blood_group).await {
        Ok(entry) => Json(json!({ "success": true, "inventory": entry })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn update_counts(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CountsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(raw), Some(available), Some(reserved)) =
        (dto::required(body.blood_group), body.available_units, body.reserved_units)
    else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "Blood group, available units, and reserved units are required",
        );
    };

    let parsed = raw.parse::<BloodGroup>().and_then(|g| {
        Ok((
            g,
            dto::count(available, "available_units")?,
            dto::count(reserved, "reserved_units")?,
        ))
    });
    let (blood_group, available, reserved) = match parsed {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.set_counts(blood_group, available, reserved).await {
        Ok(_) => common::message("Blood inventory updated successfully"),
        Err(e) => services.store_error(e),
    }
}

#[derive(Clone, Copy)]
enum UnitsOp {
    Add,
    Reserve,
    Release,
}

async fn apply_units(
    services: Arc<AppServices>,
    body: Result<Json<dto::UnitsRequest>, JsonRejection>,
    op: UnitsOp,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(raw), Some(units)) = (dto::required(body.blood_group), body.units) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Blood group and units are required");
    };
    let parsed = raw
        .parse::<BloodGroup>()
        .and_then(|g| Ok((g, dto::positive_units(units, "units")?)));
    let (blood_group, units) = match parsed {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let ledger: &dyn InventoryLedger = services.ledger.as_ref();
    let (result, done) = match op {
        UnitsOp::Add => (ledger.add(blood_group, units).await, "added to inventory"),
        UnitsOp::Reserve => (ledger.reserve(blood_group, units).await, "reserved successfully"),
        UnitsOp::Release => (ledger.release(blood_group, units).await, "released successfully"),
    };
    match result {
        Ok(_) => common::message(format!("{units} units of {blood_group} blood {done}")),
        Err(e) => services.store_error(e),
    }
}

pub async fn add_units(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UnitsRequest>, JsonRejection>,
) -> axum::response::Response {
    apply_units(services, body, UnitsOp::Add).await
}

pub async fn reserve_units(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UnitsRequest>, JsonRejection>,
) -> axum::response::Response {
    apply_units(services, body, UnitsOp::Reserve).await
}

pub async fn release_units(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UnitsRequest>, JsonRejection>,
) -> axum::response::Response {
    apply_units(services, body, UnitsOp::Release).await
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::LowStockQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::query_rejection(e),
    };
    let threshold = query.threshold.unwrap_or(services.config.low_stock_threshold);
    match services.ledger.low_stock(threshold).await {
        Ok(entries) => Json(json!({
            "success": true,
            "lowStock": entries,
            "threshold": threshold,
        }))
        .into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn statistics(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.statistics(services.config.critical_stock_threshold).await {
        Ok(statistics) => Json(json!({ "success": true, "statistics": statistics })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn initialize(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CountsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let Some(raw) = dto::required(body.blood_group) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Blood group is required");
    };
    let parsed = raw.parse::<BloodGroup>().and_then(|g| {
        Ok((
            g,
            dto::count(body.available_units.unwrap_or(0), "available_units")?,
            dto::count(body.reserved_units.unwrap_or(0), "reserved_units")?,
        ))
    });
    let (blood_group, available, reserved) = match parsed {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.initialize(blood_group, available, reserved).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": format!("Blood group {blood_group} initialized in inventory"),
            })),
        )
            .into_response(),
        Err(e) => services.store_error(e),
    }
}

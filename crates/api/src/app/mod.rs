//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the handle shared by all handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and field helpers
//! - `errors.rs`: the `{success: false, message}` error envelope

use std::sync::Arc;

use axum::{http::StatusCode, Extension, Router};
use tower::{Layer, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use bloodbank_infra::config::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// The served application: the router behind trailing-slash normalization,
/// so `/api/health/` reaches the same handler as `/api/health`.
///
/// Serve it with `axum::ServiceExt::<axum::extract::Request>::into_make_service`.
pub type App = NormalizePath<Router>;

/// Build the full HTTP application (public entrypoint used by `main.rs` and
/// the black-box tests).
pub async fn build_app(config: AppConfig) -> anyhow::Result<App> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(NormalizePathLayer::trim_trailing_slash().layer(router(services)))
}

/// Mount the API under `/api` over already-built services.
pub fn router(services: Arc<AppServices>) -> Router {
    let api = routes::router()
        .fallback(endpoint_not_found)
        .layer(Extension(services));

    Router::new()
        .nest("/api", api)
        .fallback(endpoint_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(CorsLayer::permissive()),
        )
}

async fn endpoint_not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "API endpoint not found")
}

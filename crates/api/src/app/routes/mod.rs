use axum::{routing::get, Router};

pub mod auth;
pub mod common;
pub mod contact;
pub mod donations;
pub mod inventory;
pub mod requests;
pub mod system;

/// Every endpoint, relative to the `/api` mount point.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::docs))
        .route("/health", get(system::health))
        .nest("/auth", auth::router())
        .nest("/blood-requests", requests::router())
        .nest("/donations", donations::router())
        .nest("/contact", contact::router())
        .nest("/inventory", inventory::router())
}

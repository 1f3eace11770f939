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

use bloodbank_core::MessageId;
use bloodbank_directory::{ContactStatus, NewContactMessage};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

use super::common;

pub fn router() -> Router {
    Router::new()
        .route("/submit", post(submit_message))
        .route("/all", get(list_messages))
        .route("/unread", get(unread_messages))
        .route("/statistics/overview", get(statistics))
        .route("/:id", get(get_message).delete(delete_message))
        .route("/:id/read", put(mark_read))
        .route("/:id/replied", put(mark_replied))
}

pub async fn submit_message(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ContactSubmitRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(name), Some(email), Some(message)) =
        (dto::required(body.name), dto::required(body.email), dto::required(body.message))
    else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Name, email, and message are required");
    };

    let new = NewContactMessage {
        name,
        email,
        phone: bloodbank_directory::non_blank(body.phone),
        message,
    };
    match services.contact.submit(new).await {
        Ok(message) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Message sent successfully",
                "message_id": message.id,
            })),
        )
            .into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn list_messages(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.contact.list_all().await {
        Ok(messages) => Json(json!({ "success": true, "messages": messages })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn unread_messages(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.contact.unread().await {
        Ok(messages) => Json(json!({ "success": true, "messages": messages })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn get_message(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.contact.get(MessageId::new(id)).await {
        Ok(message) => Json(json!({ "success": true, "message": message })).into_response(),
        Err(e) => services.store_error(e),
    }
}

async fn set_status(
    services: Arc<AppServices>,
    path: Result<Path<i64>, PathRejection>,
    status: ContactStatus,
    done: &str,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.contact.set_status(MessageId::new(id), status).await {
        Ok(()) => common::message(done),
        Err(e) => services.store_error(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    set_status(services, path, ContactStatus::Read, "Message marked as read").await
}

pub async fn mark_replied(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    set_status(services, path, ContactStatus::Replied, "Message marked as replied").await
}

pub async fn delete_message(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.contact.delete(MessageId::new(id)).await {
        Ok(()) => common::message("Message deleted successfully"),
        Err(e) => services.store_error(e),
    }
}

pub async fn statistics(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.contact.statistics(chrono::Utc::now()).await {
        Ok(statistics) => Json(json!({ "success": true, "statistics": statistics })).into_response(),
        Err(e) => services.store_error(e),
    }
}

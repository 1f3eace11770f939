use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, Secret};
use serde_json::json;

use bloodbank_core::{BloodGroup, UserId};
use bloodbank_directory::{NewUser, ProfileUpdate};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

use super::common;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile/:id", get(get_profile).put(update_profile))
        .route("/users", get(list_users))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(name), Some(email), Some(password), Some(blood_group)) = (
        dto::required(body.name),
        dto::required(body.email),
        dto::required(body.password),
        dto::required(body.blood_group),
    ) else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "Name, email, password, and blood group are required",
        );
    };
    let blood_group: BloodGroup = match blood_group.parse() {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let password_hash = match bloodbank_auth::hash_password(Secret::new(password)).await {
        Ok(hash) => hash,
        Err(e) => return services.auth_error(e),
    };

    let new = NewUser {
        name,
        email,
        password_hash: password_hash.expose_secret().clone(),
        phone: body.phone,
        blood_group,
        location: body.location,
        city: body.city,
        state: body.state,
    };
    match services.users.register(new).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user registered");
            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "message": "User registered successfully",
                    "user": user,
                })),
            )
                .into_response()
        }
        Err(e) => services.store_error(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    let (Some(email), Some(password)) = (dto::required(body.email), dto::required(body.password)) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Email and password are required");
    };

    let user = match services.users.find_by_email(&email).await {
        Ok(user) => user,
        Err(e) => return services.store_error(e),
    };
    let stored = user.as_ref().map(|u| Secret::new(u.password_hash.clone()));
    if let Err(e) = bloodbank_auth::verify_password(stored, Secret::new(password)).await {
        return services.auth_error(e);
    }

    match user {
        Some(user) => Json(json!({
            "success": true,
            "message": "Login successful",
            "user": user,
        }))
        .into_response(),
        None => errors::json_error(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

pub async fn get_profile(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match services.users.get(UserId::new(id)).await {
        Ok(user) => Json(json!({ "success": true, "user": user })).into_response(),
        Err(e) => services.store_error(e),
    }
}

pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> axum::response::Response {
    let id = match common::path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(update) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };
    match services.users.update_profile(UserId::new(id), update).await {
        Ok(_) => common::message("Profile updated successfully"),
        Err(e) => services.store_error(e),
    }
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.users.list().await {
        Ok(users) => Json(json!({ "success": true, "users": users })).into_response(),
        Err(e) => services.store_error(e),
    }
}

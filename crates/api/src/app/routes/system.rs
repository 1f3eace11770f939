use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn health() -> axum::response::Response {
    Json(json!({
        "success": true,
        "message": "BloodBank API is running",
        "timestamp": chrono::Utc::now(),
    }))
    .into_response()
}

pub async fn docs() -> axum::response::Response {
    Json(json!({
        "success": true,
        "message": "BloodBank API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": {
                "POST /api/auth/register": "Register a new user",
                "POST /api/auth/login": "Log in with email and password",
                "GET /api/auth/profile/:id": "Get a user profile",
                "PUT /api/auth/profile/:id": "Update a user profile",
                "GET /api/auth/users": "List all users",
            },
            "bloodRequests": {
                "POST /api/blood-requests/create": "Create a blood request",
                "GET /api/blood-requests/all": "List all blood requests",
                "GET /api/blood-requests/by-blood-group/:bloodGroup": "Pending requests for a blood group",
                "GET /api/blood-requests/by-location?city&state": "Pending requests near a location",
                "GET /api/blood-requests/urgent/all": "Pending High and Emergency requests",
                "GET /api/blood-requests/:id": "Get a blood request",
                "PUT /api/blood-requests/:id/status": "Update a request status",
                "DELETE /api/blood-requests/:id": "Delete a blood request",
            },
            "donations": {
                "POST /api/donations/schedule": "Schedule a donation",
                "PUT /api/donations/:id/complete": "Complete a donation and credit the inventory",
                "PUT /api/donations/:id/cancel": "Cancel a scheduled donation",
                "GET /api/donations/all": "List all donations",
                "GET /api/donations/donor/:donorId": "Donations of one donor",
                "GET /api/donations/by-blood-group/:bloodGroup": "Completed donations for a blood group",
                "GET /api/donations/statistics": "Donation statistics",
            },
            "contact": {
                "POST /api/contact/submit": "Send a contact message",
                "GET /api/contact/all": "List all messages",
                "GET /api/contact/unread": "List unread messages",
                "GET /api/contact/:id": "Get a message",
                "PUT /api/contact/:id/read": "Mark a message as read",
                "PUT /api/contact/:id/replied": "Mark a message as replied",
                "DELETE /api/contact/:id": "Delete a message",
                "GET /api/contact/statistics/overview": "Message statistics",
            },
            "inventory": {
                "GET /api/inventory/all": "List the blood inventory",
                "GET /api/inventory/blood-group/:bloodGroup": "Inventory of one blood group",
                "PUT /api/inventory/update": "Overwrite available and reserved units",
                "POST /api/inventory/add": "Add available units",
                "POST /api/inventory/reserve": "Reserve available units",
                "POST /api/inventory/release": "Release reserved units",
                "GET /api/inventory/low-stock?threshold": "Blood groups at or below the threshold",
                "GET /api/inventory/statistics": "Inventory statistics",
                "POST /api/inventory/initialize": "Create the entry for a blood group",
            },
        },
    }))
    .into_response()
}

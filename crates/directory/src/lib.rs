//! Users, blood requests and contact messages.

pub mod blood_request;
pub mod contact;
pub mod email;
pub mod user;

pub use blood_request::{BloodRequest, BloodRequestView, NewBloodRequest, RequestStatus, UrgencyLevel};
pub use contact::{ContactMessage, ContactStatistics, ContactStatus, NewContactMessage};
pub use email::{is_valid_email, normalize_email};
pub use user::{NewUser, ProfileUpdate, User};

/// Trim an optional free-text field, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

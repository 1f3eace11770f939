use core::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BloodGroup, DomainError, DomainResult, RequestId, UserId};

use crate::non_blank;

/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "Low",
            UrgencyLevel::Medium => "Medium",
            UrgencyLevel::High => "High",
            UrgencyLevel::Emergency => "Emergency",
        }
    }

    pub fn is_urgent(&self) -> bool {
        *self >= UrgencyLevel::High
    }
}

impl core::str::FromStr for UrgencyLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(UrgencyLevel::Low),
            "medium" => Ok(UrgencyLevel::Medium),
            "high" => Ok(UrgencyLevel::High),
            "emergency" => Ok(UrgencyLevel::Emergency),
            _ => Err(DomainError::validation(format!(
                "invalid urgency level '{}': expected Low, Medium, High or Emergency",
                s.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Fulfilled => "Fulfilled",
            RequestStatus::Cancelled => "Cancelled",
        }
    }
}

impl core::str::FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "fulfilled" => Ok(RequestStatus::Fulfilled),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(DomainError::validation(format!(
                "invalid request status '{}': expected Pending, Approved, Fulfilled or Cancelled",
                s.trim()
            ))),
        }
    }
}

/// Command: create a blood request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBloodRequest {
    pub requester_id: Option<UserId>,
    pub patient_name: String,
    pub blood_group: BloodGroup,
    pub units_required: u32,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub urgency_level: UrgencyLevel,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub reason: Option<String>,
    pub required_date: Option<NaiveDate>,
}

impl NewBloodRequest {
    pub fn normalized(mut self) -> DomainResult<Self> {
        self.patient_name = self.patient_name.trim().to_string();
        if self.patient_name.is_empty() || self.units_required == 0 {
            return Err(DomainError::validation(
                "Patient name, blood group, and units required are mandatory",
            ));
        }
        if self.units_required > i32::MAX as u32 {
            return Err(DomainError::validation("units required is too large"));
        }
        self.hospital_name = non_blank(self.hospital_name);
        self.hospital_address = non_blank(self.hospital_address);
        self.contact_person = non_blank(self.contact_person);
        self.contact_phone = non_blank(self.contact_phone);
        self.reason = non_blank(self.reason);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BloodRequest {
    pub id: RequestId,
    pub requester_id: Option<UserId>,
    pub patient_name: String,
    pub blood_group: BloodGroup,
    pub units_required: u32,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub urgency_level: UrgencyLevel,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub reason: Option<String>,
    pub required_date: Option<NaiveDate>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BloodRequest {
    pub fn open(id: RequestId, new: NewBloodRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            requester_id: new.requester_id,
            patient_name: new.patient_name,
            blood_group: new.blood_group,
            units_required: new.units_required,
            hospital_name: new.hospital_name,
            hospital_address: new.hospital_address,
            urgency_level: new.urgency_level,
            contact_person: new.contact_person,
            contact_phone: new.contact_phone,
            reason: new.reason,
            required_date: new.required_date,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn not_found() -> DomainError {
        DomainError::not_found("Blood request not found")
    }

    pub fn set_status(&mut self, status: RequestStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

/// A request joined with its requester's contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BloodRequestView {
    #[serde(flatten)]
    pub request: BloodRequest,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub requester_phone: Option<String>,
    pub requester_city: Option<String>,
    pub requester_state: Option<String>,
}

impl BloodRequestView {
    /// Pending listings: most urgent first, then newest first.
    pub fn pending_order(a: &Self, b: &Self) -> Ordering {
        b.request
            .urgency_level
            .cmp(&a.request.urgency_level)
            .then_with(|| b.request.created_at.cmp(&a.request.created_at))
            .then_with(|| b.request.id.cmp(&a.request.id))
    }

    /// Urgent listing: most urgent first, then oldest first.
    pub fn urgent_order(a: &Self, b: &Self) -> Ordering {
        b.request
            .urgency_level
            .cmp(&a.request.urgency_level)
            .then_with(|| a.request.created_at.cmp(&b.request.created_at))
            .then_with(|| a.request.id.cmp(&b.request.id))
    }
}

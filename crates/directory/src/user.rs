use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BloodGroup, DomainError, DomainResult, UserId};

use crate::email::{is_valid_email, normalize_email};
use crate::non_blank;

/// A registered donor and/or recipient.
///
/// `password_hash` never leaves the process: it is skipped on serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub blood_group: BloodGroup,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_donor: bool,
    pub is_recipient: bool,
    pub last_donation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn register(id: UserId, new: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            phone: new.phone,
            blood_group: new.blood_group,
            location: new.location,
            city: new.city,
            state: new.state,
            is_donor: false,
            is_recipient: false,
            last_donation_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn not_found() -> DomainError {
        DomainError::not_found("User not found")
    }

    pub fn donor_not_found() -> DomainError {
        DomainError::not_found("Donor not found")
    }

    pub fn email_taken() -> DomainError {
        DomainError::already_exists("User with this email already exists")
    }

    /// Apply a profile update. Fields left as `None` keep their value.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        update.validate()?;
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if update.phone.is_some() {
            self.phone = non_blank(update.phone);
        }
        if update.location.is_some() {
            self.location = non_blank(update.location);
        }
        if update.city.is_some() {
            self.city = non_blank(update.city);
        }
        if update.state.is_some() {
            self.state = non_blank(update.state);
        }
        if let Some(is_donor) = update.is_donor {
            self.is_donor = is_donor;
        }
        if let Some(is_recipient) = update.is_recipient {
            self.is_recipient = is_recipient;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Mark the user as a donor with their most recent scheduled donation.
    pub fn record_donation(&mut self, date: NaiveDate, now: DateTime<Utc>) {
        self.is_donor = true;
        self.last_donation_date = Some(date);
        self.updated_at = now;
    }
}

/// Command: register a user. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub blood_group: BloodGroup,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl NewUser {
    /// Trim and normalize the fields, rejecting a blank name or a malformed email.
    pub fn normalized(mut self) -> DomainResult<Self> {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        if self.name.is_empty() {
            return Err(DomainError::validation("Name is required"));
        }
        if !is_valid_email(&self.email) {
            return Err(DomainError::validation("Please provide a valid email address"));
        }
        self.phone = non_blank(self.phone);
        self.location = non_blank(self.location);
        self.city = non_blank(self.city);
        self.state = non_blank(self.state);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_donor: Option<bool>,
    pub is_recipient: Option<bool>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(DomainError::validation("Name cannot be empty"));
        }
        Ok(())
    }
}

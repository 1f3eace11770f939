use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{DomainError, DomainResult, MessageId};

use crate::email::is_valid_email;
use crate::non_blank;

/// Messages younger than this count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContactStatus {
    #[default]
    Unread,
    Read,
    Replied,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Unread => "Unread",
            ContactStatus::Read => "Read",
            ContactStatus::Replied => "Replied",
        }
    }
}

impl core::str::FromStr for ContactStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unread" => Ok(ContactStatus::Unread),
            "Read" => Ok(ContactStatus::Read),
            "Replied" => Ok(ContactStatus::Replied),
            other => Err(DomainError::validation(format!("unknown contact status '{other}'"))),
        }
    }
}

/// Command: submit a message through the contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

impl NewContactMessage {
    pub fn normalized(mut self) -> DomainResult<Self> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.message = self.message.trim().to_string();
        if self.name.is_empty() || self.email.is_empty() || self.message.is_empty() {
            return Err(DomainError::validation("Name, email, and message are required"));
        }
        if !is_valid_email(&self.email) {
            return Err(DomainError::validation("Please provide a valid email address"));
        }
        self.phone = non_blank(self.phone);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub id: MessageId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    pub fn not_found() -> DomainError {
        DomainError::not_found("Message not found")
    }

    pub fn received(id: MessageId, new: NewContactMessage, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            message: new.message,
            status: ContactStatus::Unread,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContactStatistics {
    pub total: u64,
    pub unread: u64,
    pub read: u64,
    pub replied: u64,
    pub recent: u64,
}

impl ContactStatistics {
    pub fn from_messages<'a>(
        messages: impl IntoIterator<Item = &'a ContactMessage>,
        now: DateTime<Utc>,
    ) -> Self {
        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        messages.into_iter().fold(Self::default(), |mut s, m| {
            s.total += 1;
            match m.status {
                ContactStatus::Unread => s.unread += 1,
                ContactStatus::Read => s.read += 1,
                ContactStatus::Replied => s.replied += 1,
            }
            if m.created_at >= cutoff {
                s.recent += 1;
            }
            s
        })
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BloodGroup, DomainError, DomainResult, DonationId, RequestId, UserId};

/// Donation lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonationStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Scheduled => "Scheduled",
            DonationStatus::Completed => "Completed",
            DonationStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DonationStatus::Scheduled)
    }
}

impl core::fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DonationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(DonationStatus::Scheduled),
            "Completed" => Ok(DonationStatus::Completed),
            "Cancelled" => Ok(DonationStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown donation status '{other}'"))),
        }
    }
}

/// What scheduling does when the supplied blood group differs from the
/// donor's recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Refuse the donation with `BloodGroupMismatch`.
    #[default]
    Reject,
    /// Record the donation as supplied and let the caller log a warning.
    Warn,
}

impl core::str::FromStr for MismatchPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(MismatchPolicy::Reject),
            "warn" => Ok(MismatchPolicy::Warn),
            other => Err(DomainError::validation(format!(
                "mismatch policy must be 'reject' or 'warn', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchOutcome {
    Match,
    Tolerated { recorded: BloodGroup },
}

/// Compare the donor's recorded blood group with the supplied one under `policy`.
pub fn check_donor_blood_group(
    recorded: BloodGroup,
    supplied: BloodGroup,
    policy: MismatchPolicy,
) -> DomainResult<MismatchOutcome> {
    if recorded == supplied {
        return Ok(MismatchOutcome::Match);
    }
    match policy {
        MismatchPolicy::Reject => Err(DomainError::BloodGroupMismatch { recorded, supplied }),
        MismatchPolicy::Warn => Ok(MismatchOutcome::Tolerated { recorded }),
    }
}

/// Command: schedule a donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDonation {
    pub donor_id: UserId,
    pub request_id: Option<RequestId>,
    pub donation_date: NaiveDate,
    pub blood_group: BloodGroup,
    pub units_donated: u32,
    pub donation_center: Option<String>,
    pub notes: Option<String>,
}

impl ScheduleDonation {
    pub fn validate(&self) -> DomainResult<()> {
        if self.units_donated == 0 {
            return Err(DomainError::validation("units donated must be a positive integer"));
        }
        if self.units_donated > i32::MAX as u32 {
            return Err(DomainError::validation("units donated is too large"));
        }
        Ok(())
    }
}

/// A donation as stored.
///
/// Status changes go through [`complete`](Self::complete) and
/// [`cancel`](Self::cancel); both refuse to leave a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationRecord {
    pub id: DonationId,
    pub donor_id: UserId,
    pub request_id: Option<RequestId>,
    pub donation_date: NaiveDate,
    pub blood_group: BloodGroup,
    pub units_donated: u32,
    pub donation_center: Option<String>,
    pub notes: Option<String>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DonationRecord {
    pub fn scheduled(id: DonationId, cmd: ScheduleDonation, now: DateTime<Utc>) -> Self {
        Self {
            id,
            donor_id: cmd.donor_id,
            request_id: cmd.request_id,
            donation_date: cmd.donation_date,
            blood_group: cmd.blood_group,
            units_donated: cmd.units_donated,
            donation_center: cmd.donation_center,
            notes: cmd.notes,
            status: DonationStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn not_found() -> DomainError {
        DomainError::not_found("Donation record not found")
    }

    /// Scheduled → Completed. Notes, when given, replace the stored ones.
    pub fn complete(&mut self, notes: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_scheduled("complete")?;
        self.status = DonationStatus::Completed;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Scheduled → Cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_scheduled("cancel")?;
        self.status = DonationStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_scheduled(&self, action: &str) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} donation {}: already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

/// Donation joined with donor and linked request details for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationView {
    #[serde(flatten)]
    pub donation: DonationRecord,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub donor_phone: Option<String>,
    pub patient_name: Option<String>,
    pub hospital_name: Option<String>,
}

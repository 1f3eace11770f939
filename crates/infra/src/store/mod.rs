//! Storage boundary for the ledger, donations and the directory.
//!
//! Every mutating method is a single atomic step against the backing store:
//! either one critical section (in-memory) or one conditional statement or
//! transaction (Postgres).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use bloodbank_core::{BloodGroup, DomainError, DonationId, MessageId, RequestId, UserId};
use bloodbank_directory::{
    BloodRequest, BloodRequestView, ContactMessage, ContactStatistics, ContactStatus, NewBloodRequest,
    NewContactMessage, NewUser, ProfileUpdate, RequestStatus, User,
};
use bloodbank_donations::{DonationRecord, DonationStatistics, DonationView, MismatchPolicy, ScheduleDonation};
use bloodbank_inventory::{InventoryStatistics, LedgerEntry, low_stock};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// The ledger row kept changing underneath a conditional update.
    #[error("contention on {0}")]
    Contention(String),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Move units from available to reserved.
    async fn reserve(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry>;

    /// Move units from reserved back to available.
    async fn release(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry>;

    async fn add(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry>;

    /// Administrative overwrite of both counters.
    async fn set_counts(&self, blood_group: BloodGroup, available: u32, reserved: u32) -> StoreResult<LedgerEntry>;

    /// Create the entry for a blood group; `AlreadyExists` if present.
    async fn initialize(&self, blood_group: BloodGroup, available: u32, reserved: u32) -> StoreResult<LedgerEntry>;

    /// All entries, ordered by blood-group name (`A+`, `A-`, `AB+`, ...).
    async fn list(&self) -> StoreResult<Vec<LedgerEntry>>;

    async fn get(&self, blood_group: BloodGroup) -> StoreResult<LedgerEntry>;

    async fn low_stock(&self, threshold: u32) -> StoreResult<Vec<LedgerEntry>> {
        Ok(low_stock(&self.list().await?, threshold))
    }

    async fn statistics(&self, critical_threshold: u32) -> StoreResult<InventoryStatistics> {
        Ok(InventoryStatistics::from_entries(&self.list().await?, critical_threshold))
    }
}

#[async_trait]
pub trait DonationRecorder: Send + Sync {
    /// Record a Scheduled donation and mark the donor, atomically.
    async fn schedule(&self, cmd: ScheduleDonation, policy: MismatchPolicy) -> StoreResult<DonationRecord>;

    /// Complete a Scheduled donation and credit the ledger in the same step.
    async fn complete(&self, id: DonationId, notes: Option<String>) -> StoreResult<DonationRecord>;

    async fn cancel(&self, id: DonationId) -> StoreResult<DonationRecord>;

    /// Newest first.
    async fn list_all(&self) -> StoreResult<Vec<DonationView>>;

    /// Latest donation date first.
    async fn by_donor(&self, donor_id: UserId) -> StoreResult<Vec<DonationView>>;

    async fn completed_by_blood_group(&self, blood_group: BloodGroup) -> StoreResult<Vec<DonationView>>;

    async fn statistics(&self, today: NaiveDate) -> StoreResult<DonationStatistics>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn register(&self, new: NewUser) -> StoreResult<User>;

    /// Lookup by normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn get(&self, id: UserId) -> StoreResult<User>;

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<User>;

    /// Newest first.
    async fn list(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait RequestDirectory: Send + Sync {
    async fn create(&self, new: NewBloodRequest) -> StoreResult<BloodRequest>;

    /// Newest first.
    async fn list_all(&self) -> StoreResult<Vec<BloodRequestView>>;

    async fn pending_by_blood_group(&self, blood_group: BloodGroup) -> StoreResult<Vec<BloodRequestView>>;

    /// Pending requests whose requester lives in `city` and/or `state`
    /// (case-insensitive). With neither given, all pending requests.
    async fn pending_by_location(
        &self,
        city: Option<String>,
        state: Option<String>,
    ) -> StoreResult<Vec<BloodRequestView>>;

    /// Pending High/Emergency requests, most urgent then oldest first.
    async fn urgent(&self) -> StoreResult<Vec<BloodRequestView>>;

    async fn get(&self, id: RequestId) -> StoreResult<BloodRequestView>;

    async fn update_status(&self, id: RequestId, status: RequestStatus) -> StoreResult<()>;

    async fn delete(&self, id: RequestId) -> StoreResult<()>;
}

#[async_trait]
pub trait ContactInbox: Send + Sync {
    async fn submit(&self, new: NewContactMessage) -> StoreResult<ContactMessage>;

    /// Newest first.
    async fn list_all(&self) -> StoreResult<Vec<ContactMessage>>;

    /// Unread messages, newest first.
    async fn unread(&self) -> StoreResult<Vec<ContactMessage>>;

    async fn get(&self, id: MessageId) -> StoreResult<ContactMessage>;

    async fn set_status(&self, id: MessageId, status: ContactStatus) -> StoreResult<()>;

    async fn delete(&self, id: MessageId) -> StoreResult<()>;

    async fn statistics(&self, now: DateTime<Utc>) -> StoreResult<ContactStatistics>;
}

/// Create an entry at zero for every blood group that has none yet.
pub async fn seed_inventory(ledger: &dyn InventoryLedger) -> StoreResult<usize> {
    let mut created = 0;
    for group in BloodGroup::ALL {
        match ledger.initialize(group, 0, 0).await {
            Ok(_) => created += 1,
            Err(StoreError::Domain(DomainError::AlreadyExists(_))) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests;

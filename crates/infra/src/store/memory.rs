//! In-memory store for development and tests.
//!
//! All tables sit behind one `RwLock`, so every operation (including the
//! cross-table ones such as donation completion) is a single critical section.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use bloodbank_core::{BloodGroup, DonationId, MessageId, RequestId, UserId};
use bloodbank_directory::{
    BloodRequest, BloodRequestView, ContactMessage, ContactStatistics, ContactStatus, NewBloodRequest,
    NewContactMessage, NewUser, ProfileUpdate, RequestStatus, User,
};
use bloodbank_donations::{
    DonationRecord, DonationStatistics, DonationStatus, DonationView, MismatchOutcome, MismatchPolicy,
    ScheduleDonation, check_donor_blood_group,
};
use bloodbank_inventory::LedgerEntry;

use super::{
    ContactInbox, DonationRecorder, InventoryLedger, RequestDirectory, StoreError, StoreResult, UserDirectory,
};

#[derive(Debug, Default)]
struct Tables {
    ledger: BTreeMap<BloodGroup, LedgerEntry>,
    users: BTreeMap<UserId, User>,
    donations: BTreeMap<DonationId, DonationRecord>,
    requests: BTreeMap<RequestId, BloodRequest>,
    messages: BTreeMap<MessageId, ContactMessage>,
    last_user_id: i64,
    last_donation_id: i64,
    last_request_id: i64,
    last_message_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

impl Tables {
    fn donation_view(&self, d: &DonationRecord) -> DonationView {
        let donor = self.users.get(&d.donor_id);
        let request = d.request_id.and_then(|id| self.requests.get(&id));
        DonationView {
            donation: d.clone(),
            donor_name: donor.map(|u| u.name.clone()),
            donor_email: donor.map(|u| u.email.clone()),
            donor_phone: donor.and_then(|u| u.phone.clone()),
            patient_name: request.map(|r| r.patient_name.clone()),
            hospital_name: request.and_then(|r| r.hospital_name.clone()),
        }
    }

    fn request_view(&self, r: &BloodRequest) -> BloodRequestView {
        let requester = r.requester_id.and_then(|id| self.users.get(&id));
        BloodRequestView {
            request: r.clone(),
            requester_name: requester.map(|u| u.name.clone()),
            requester_email: requester.map(|u| u.email.clone()),
            requester_phone: requester.and_then(|u| u.phone.clone()),
            requester_city: requester.and_then(|u| u.city.clone()),
            requester_state: requester.and_then(|u| u.state.clone()),
        }
    }

    fn pending_views(&self, keep: impl Fn(&BloodRequestView) -> bool) -> Vec<BloodRequestView> {
        let mut rows: Vec<BloodRequestView> = self
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .map(|r| self.request_view(r))
            .filter(|v| keep(v))
            .collect();
        rows.sort_by(BloodRequestView::pending_order);
        rows
    }

    fn ledger_entry_mut(&mut self, blood_group: BloodGroup) -> StoreResult<&mut LedgerEntry> {
        self.ledger
            .get_mut(&blood_group)
            .ok_or_else(|| LedgerEntry::not_found().into())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }

    fn mutate_entry(
        &self,
        blood_group: BloodGroup,
        op: impl FnOnce(&mut LedgerEntry, DateTime<Utc>) -> bloodbank_core::DomainResult<()>,
    ) -> StoreResult<LedgerEntry> {
        let mut tables = self.write()?;
        let entry = tables.ledger_entry_mut(blood_group)?;
        op(entry, Utc::now())?;
        Ok(entry.clone())
    }
}

fn eq_ignore_case(field: Option<&String>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) => field.is_some_and(|f| f.eq_ignore_ascii_case(w)),
    }
}

#[async_trait]
impl InventoryLedger for InMemoryStore {
    async fn reserve(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry> {
        self.mutate_entry(blood_group, |e, now| e.reserve(units, now))
    }

    async fn release(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry> {
        self.mutate_entry(blood_group, |e, now| e.release(units, now))
    }

    async fn add(&self, blood_group: BloodGroup, units: u32) -> StoreResult<LedgerEntry> {
        self.mutate_entry(blood_group, |e, now| e.add(units, now))
    }

    async fn set_counts(&self, blood_group: BloodGroup, available: u32, reserved: u32) -> StoreResult<LedgerEntry> {
        self.mutate_entry(blood_group, |e, now| e.set_counts(available, reserved, now))
    }

    async fn initialize(&self, blood_group: BloodGroup, available: u32, reserved: u32) -> StoreResult<LedgerEntry> {
        let entry = LedgerEntry::new(blood_group, available, reserved, Utc::now())?;
        let mut tables = self.write()?;
        if tables.ledger.contains_key(&blood_group) {
            return Err(LedgerEntry::already_initialized().into());
        }
        tables.ledger.insert(blood_group, entry.clone());
        Ok(entry)
    }

    async fn list(&self) -> StoreResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self.read()?.ledger.values().cloned().collect();
        entries.sort_by(|a, b| a.blood_group().as_str().cmp(b.blood_group().as_str()));
        Ok(entries)
    }

    async fn get(&self, blood_group: BloodGroup) -> StoreResult<LedgerEntry> {
        self.read()?
            .ledger
            .get(&blood_group)
            .cloned()
            .ok_or_else(|| LedgerEntry::not_found().into())
    }
}

#[async_trait]
impl DonationRecorder for InMemoryStore {
    async fn schedule(&self, cmd: ScheduleDonation, policy: MismatchPolicy) -> StoreResult<DonationRecord> {
        cmd.validate()?;
        let now = Utc::now();
        let mut tables = self.write()?;

        let recorded = tables
            .users
            .get(&cmd.donor_id)
            .map(|u| u.blood_group)
            .ok_or_else(User::donor_not_found)?;
        if let Some(request_id) = cmd.request_id {
            if !tables.requests.contains_key(&request_id) {
                return Err(BloodRequest::not_found().into());
            }
        }
        if let MismatchOutcome::Tolerated { recorded } = check_donor_blood_group(recorded, cmd.blood_group, policy)? {
            tracing::warn!(
                donor_id = %cmd.donor_id,
                recorded = %recorded,
                supplied = %cmd.blood_group,
                "donation blood group differs from donor record"
            );
        }

        let id = DonationId::new(next_id(&mut tables.last_donation_id));
        let record = DonationRecord::scheduled(id, cmd, now);
        if let Some(donor) = tables.users.get_mut(&record.donor_id) {
            donor.record_donation(record.donation_date, now);
        }
        tables.donations.insert(id, record.clone());
        Ok(record)
    }

    async fn complete(&self, id: DonationId, notes: Option<String>) -> StoreResult<DonationRecord> {
        let now = Utc::now();
        let mut tables = self.write()?;
        let Tables { donations, ledger, .. } = &mut *tables;

        let stored = donations.get_mut(&id).ok_or_else(DonationRecord::not_found)?;
        let mut updated = stored.clone();
        updated.complete(notes, now)?;

        // Credit the ledger before committing the status change; a failure leaves both untouched.
        let entry = ledger
            .get_mut(&updated.blood_group)
            .ok_or_else(LedgerEntry::not_found)?;
        entry.add(updated.units_donated, now)?;

        *stored = updated.clone();
        Ok(updated)
    }

    async fn cancel(&self, id: DonationId) -> StoreResult<DonationRecord> {
        let mut tables = self.write()?;
        let stored = tables.donations.get_mut(&id).ok_or_else(DonationRecord::not_found)?;
        stored.cancel(Utc::now())?;
        Ok(stored.clone())
    }

    async fn list_all(&self) -> StoreResult<Vec<DonationView>> {
        let tables = self.read()?;
        let mut rows: Vec<DonationView> = tables.donations.values().map(|d| tables.donation_view(d)).collect();
        rows.sort_by(|a, b| {
            b.donation
                .created_at
                .cmp(&a.donation.created_at)
                .then_with(|| b.donation.id.cmp(&a.donation.id))
        });
        Ok(rows)
    }

    async fn by_donor(&self, donor_id: UserId) -> StoreResult<Vec<DonationView>> {
        let tables = self.read()?;
        let mut rows: Vec<DonationView> = tables
            .donations
            .values()
            .filter(|d| d.donor_id == donor_id)
            .map(|d| tables.donation_view(d))
            .collect();
        rows.sort_by(|a, b| {
            b.donation
                .donation_date
                .cmp(&a.donation.donation_date)
                .then_with(|| b.donation.id.cmp(&a.donation.id))
        });
        Ok(rows)
    }

    async fn completed_by_blood_group(&self, blood_group: BloodGroup) -> StoreResult<Vec<DonationView>> {
        let tables = self.read()?;
        let mut rows: Vec<DonationView> = tables
            .donations
            .values()
            .filter(|d| d.blood_group == blood_group && d.status == DonationStatus::Completed)
            .map(|d| tables.donation_view(d))
            .collect();
        rows.sort_by(|a, b| {
            b.donation
                .donation_date
                .cmp(&a.donation.donation_date)
                .then_with(|| b.donation.id.cmp(&a.donation.id))
        });
        Ok(rows)
    }

    async fn statistics(&self, today: NaiveDate) -> StoreResult<DonationStatistics> {
        let tables = self.read()?;
        Ok(DonationStatistics::from_records(
            tables.donations.values(),
            |id| tables.users.get(&id).map(|u| u.name.clone()),
            today,
        ))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn register(&self, new: NewUser) -> StoreResult<User> {
        let new = new.normalized()?;
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(User::email_taken().into());
        }
        let id = UserId::new(next_id(&mut tables.last_user_id));
        let user = User::register(id, new, Utc::now());
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = bloodbank_directory::normalize_email(email);
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn get(&self, id: UserId) -> StoreResult<User> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| User::not_found().into())
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<User> {
        let mut tables = self.write()?;
        let user = tables.users.get_mut(&id).ok_or_else(User::not_found)?;
        user.apply(update, Utc::now())?;
        Ok(user.clone())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(users)
    }
}

#[async_trait]
impl RequestDirectory for InMemoryStore {
    async fn create(&self, new: NewBloodRequest) -> StoreResult<BloodRequest> {
        let new = new.normalized()?;
        let mut tables = self.write()?;
        if let Some(requester) = new.requester_id {
            if !tables.users.contains_key(&requester) {
                return Err(User::not_found().into());
            }
        }
        let id = RequestId::new(next_id(&mut tables.last_request_id));
        let request = BloodRequest::open(id, new, Utc::now());
        tables.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn list_all(&self) -> StoreResult<Vec<BloodRequestView>> {
        let tables = self.read()?;
        let mut rows: Vec<BloodRequestView> = tables.requests.values().map(|r| tables.request_view(r)).collect();
        rows.sort_by(|a, b| {
            b.request
                .created_at
                .cmp(&a.request.created_at)
                .then_with(|| b.request.id.cmp(&a.request.id))
        });
        Ok(rows)
    }

    async fn pending_by_blood_group(&self, blood_group: BloodGroup) -> StoreResult<Vec<BloodRequestView>> {
        Ok(self.read()?.pending_views(|v| v.request.blood_group == blood_group))
    }

    async fn pending_by_location(
        &self,
        city: Option<String>,
        state: Option<String>,
    ) -> StoreResult<Vec<BloodRequestView>> {
        Ok(self.read()?.pending_views(|v| {
            eq_ignore_case(v.requester_city.as_ref(), city.as_deref())
                && eq_ignore_case(v.requester_state.as_ref(), state.as_deref())
        }))
    }

    async fn urgent(&self) -> StoreResult<Vec<BloodRequestView>> {
        let mut rows = self.read()?.pending_views(|v| v.request.urgency_level.is_urgent());
        rows.sort_by(BloodRequestView::urgent_order);
        Ok(rows)
    }

    async fn get(&self, id: RequestId) -> StoreResult<BloodRequestView> {
        let tables = self.read()?;
        let request = tables.requests.get(&id).ok_or_else(BloodRequest::not_found)?;
        Ok(tables.request_view(request))
    }

    async fn update_status(&self, id: RequestId, status: RequestStatus) -> StoreResult<()> {
        let mut tables = self.write()?;
        let request = tables.requests.get_mut(&id).ok_or_else(BloodRequest::not_found)?;
        request.set_status(status, Utc::now());
        Ok(())
    }

    async fn delete(&self, id: RequestId) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.requests.remove(&id).ok_or_else(BloodRequest::not_found)?;
        for donation in tables.donations.values_mut() {
            if donation.request_id == Some(id) {
                donation.request_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContactInbox for InMemoryStore {
    async fn submit(&self, new: NewContactMessage) -> StoreResult<ContactMessage> {
        let new = new.normalized()?;
        let mut tables = self.write()?;
        let id = MessageId::new(next_id(&mut tables.last_message_id));
        let message = ContactMessage::received(id, new, Utc::now());
        tables.messages.insert(id, message.clone());
        Ok(message)
    }

    async fn list_all(&self) -> StoreResult<Vec<ContactMessage>> {
        // Ids grow with arrival time.
        Ok(self.read()?.messages.values().rev().cloned().collect())
    }

    async fn unread(&self) -> StoreResult<Vec<ContactMessage>> {
        Ok(self
            .read()?
            .messages
            .values()
            .rev()
            .filter(|m| m.status == ContactStatus::Unread)
            .cloned()
            .collect())
    }

    async fn get(&self, id: MessageId) -> StoreResult<ContactMessage> {
        self.read()?
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| ContactMessage::not_found().into())
    }

    async fn set_status(&self, id: MessageId, status: ContactStatus) -> StoreResult<()> {
        let mut tables = self.write()?;
        let message = tables.messages.get_mut(&id).ok_or_else(ContactMessage::not_found)?;
        message.status = status;
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> StoreResult<()> {
        self.write()?
            .messages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ContactMessage::not_found().into())
    }

    async fn statistics(&self, now: DateTime<Utc>) -> StoreResult<ContactStatistics> {
        Ok(ContactStatistics::from_messages(self.read()?.messages.values(), now))
    }
}

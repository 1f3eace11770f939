//! Store behaviour exercised against the in-memory backend.
//!
//! Covers ledger atomicity under concurrency, the donation lifecycle and its
//! coupling to the ledger, and directory queries.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use bloodbank_core::{BloodGroup, DomainError, UserId};
use bloodbank_directory::{
    ContactStatus, NewBloodRequest, NewContactMessage, NewUser, ProfileUpdate, RequestStatus, UrgencyLevel,
};
use bloodbank_donations::{DonationStatus, MismatchPolicy, ScheduleDonation};

use super::*;

fn donor(name: &str, email: &str, group: BloodGroup, city: Option<&str>) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$test".to_string(),
        phone: Some("555-0100".to_string()),
        blood_group: group,
        location: None,
        city: city.map(str::to_string),
        state: Some("KA".to_string()),
    }
}

fn schedule(donor_id: UserId, group: BloodGroup, units: u32) -> ScheduleDonation {
    ScheduleDonation {
        donor_id,
        request_id: None,
        donation_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        blood_group: group,
        units_donated: units,
        donation_center: Some("Central Bank".to_string()),
        notes: None,
    }
}

fn request(requester: Option<UserId>, group: BloodGroup, urgency: UrgencyLevel) -> NewBloodRequest {
    NewBloodRequest {
        requester_id: requester,
        patient_name: "Kiran".to_string(),
        blood_group: group,
        units_required: 2,
        hospital_name: Some("St. Martha's".to_string()),
        hospital_address: None,
        urgency_level: urgency,
        contact_person: None,
        contact_phone: None,
        reason: None,
        required_date: None,
    }
}

async fn seeded() -> InMemoryStore {
    let store = InMemoryStore::new();
    assert_eq!(seed_inventory(&store).await.unwrap(), BloodGroup::ALL.len());
    store
}

fn domain(err: StoreError) -> DomainError {
    match err {
        StoreError::Domain(e) => e,
        other => panic!("expected a domain error, got {other:?}"),
    }
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let store = seeded().await;
    assert_eq!(seed_inventory(&store).await.unwrap(), 0);
    assert_eq!(InventoryLedger::list(&store).await.unwrap().len(), 8);
}

#[tokio::test]
async fn ledger_lists_by_group_name() {
    let store = seeded().await;
    let names: Vec<&str> = InventoryLedger::list(&store)
        .await
        .unwrap()
        .iter()
        .map(|e| e.blood_group().as_str())
        .collect();
    assert_eq!(names, ["A+", "A-", "AB+", "AB-", "B+", "B-", "O+", "O-"]);
}

#[tokio::test]
async fn reserve_then_release_restores_counts() {
    let store = seeded().await;
    store.add(BloodGroup::OPositive, 5).await.unwrap();

    let e = store.reserve(BloodGroup::OPositive, 3).await.unwrap();
    assert_eq!((e.available_units(), e.reserved_units()), (2, 3));

    let err = domain(store.reserve(BloodGroup::OPositive, 5).await.unwrap_err());
    assert!(matches!(err, DomainError::InsufficientStock { available: 2, .. }));

    let e = store.release(BloodGroup::OPositive, 3).await.unwrap();
    assert_eq!((e.available_units(), e.reserved_units()), (5, 0));
}

#[tokio::test]
async fn unknown_group_and_double_initialize() {
    let store = InMemoryStore::new();
    let err = domain(store.reserve(BloodGroup::AbNegative, 1).await.unwrap_err());
    assert_eq!(err, DomainError::NotFound("Blood group not found in inventory".to_string()));

    store.initialize(BloodGroup::AbNegative, 4, 0).await.unwrap();
    let err = domain(store.initialize(BloodGroup::AbNegative, 9, 9).await.unwrap_err());
    assert!(matches!(err, DomainError::AlreadyExists(_)));
    assert_eq!(InventoryLedger::get(&store, BloodGroup::AbNegative).await.unwrap().available_units(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reserves_never_oversell() {
    let store = Arc::new(seeded().await);
    store.set_counts(BloodGroup::BPositive, 10, 0).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..12 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.reserve(BloodGroup::BPositive, 3).await }));
    }
    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 3);
    let e = InventoryLedger::get(&*store, BloodGroup::BPositive).await.unwrap();
    assert_eq!((e.available_units(), e.reserved_units()), (1, 9));
}

#[tokio::test]
async fn statistics_and_low_stock_use_thresholds() {
    let store = seeded().await;
    store.set_counts(BloodGroup::APositive, 20, 2).await.unwrap();
    store.set_counts(BloodGroup::ONegative, 3, 0).await.unwrap();

    let low = store.low_stock(10).await.unwrap();
    assert!(low.iter().all(|e| e.available_units() < 10));
    assert_eq!(low.len(), 7);

    let stats = InventoryLedger::statistics(&store, 5).await.unwrap();
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["totalAvailable"], 23);
    assert_eq!(json["totalReserved"], 2);
}

#[tokio::test]
async fn completing_a_donation_credits_the_ledger_once() {
    let store = seeded().await;
    let user = store
        .register(donor("Asha", "asha@example.com", BloodGroup::ONegative, Some("Mysuru")))
        .await
        .unwrap();

    let d = store
        .schedule(schedule(user.id, BloodGroup::ONegative, 2), MismatchPolicy::Reject)
        .await
        .unwrap();
    assert_eq!(d.status, DonationStatus::Scheduled);
    let marked = UserDirectory::get(&store, user.id).await.unwrap();
    assert!(marked.is_donor);
    assert_eq!(marked.last_donation_date, Some(d.donation_date));

    store.complete(d.id, Some("no reaction".to_string())).await.unwrap();
    assert_eq!(InventoryLedger::get(&store, BloodGroup::ONegative).await.unwrap().available_units(), 2);

    let err = domain(store.complete(d.id, None).await.unwrap_err());
    assert!(matches!(err, DomainError::InvalidTransition(_)));
    assert!(store.cancel(d.id).await.is_err());
    assert_eq!(InventoryLedger::get(&store, BloodGroup::ONegative).await.unwrap().available_units(), 2);
}

#[tokio::test]
async fn completion_without_ledger_entry_leaves_donation_scheduled() {
    let store = InMemoryStore::new();
    let user = store
        .register(donor("Ravi", "ravi@example.com", BloodGroup::BNegative, None))
        .await
        .unwrap();
    let d = store
        .schedule(schedule(user.id, BloodGroup::BNegative, 1), MismatchPolicy::Reject)
        .await
        .unwrap();

    let err = domain(store.complete(d.id, None).await.unwrap_err());
    assert!(matches!(err, DomainError::NotFound(_)));

    let views = store.by_donor(user.id).await.unwrap();
    assert_eq!(views[0].donation.status, DonationStatus::Scheduled);
}

#[tokio::test]
async fn mismatched_blood_group_follows_policy() {
    let store = seeded().await;
    let user = store
        .register(donor("Meera", "meera@example.com", BloodGroup::APositive, None))
        .await
        .unwrap();

    let err = domain(
        store
            .schedule(schedule(user.id, BloodGroup::BPositive, 1), MismatchPolicy::Reject)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::BloodGroupMismatch { .. }));
    assert!(DonationRecorder::list_all(&store).await.unwrap().is_empty());

    let d = store
        .schedule(schedule(user.id, BloodGroup::BPositive, 1), MismatchPolicy::Warn)
        .await
        .unwrap();
    assert_eq!(d.blood_group, BloodGroup::BPositive);
}

#[tokio::test]
async fn scheduling_requires_known_donor_and_request() {
    let store = seeded().await;
    let err = domain(
        store
            .schedule(schedule(UserId::new(99), BloodGroup::APositive, 1), MismatchPolicy::Reject)
            .await
            .unwrap_err(),
    );
    assert_eq!(err, DomainError::NotFound("Donor not found".to_string()));

    let user = store
        .register(donor("Dev", "dev@example.com", BloodGroup::APositive, None))
        .await
        .unwrap();
    let mut cmd = schedule(user.id, BloodGroup::APositive, 1);
    cmd.request_id = Some(bloodbank_core::RequestId::new(42));
    let err = domain(store.schedule(cmd, MismatchPolicy::Reject).await.unwrap_err());
    assert_eq!(err, DomainError::NotFound("Blood request not found".to_string()));
}

#[tokio::test]
async fn donation_statistics_count_completed_only() {
    let store = seeded().await;
    let a = store
        .register(donor("Asha", "asha@example.com", BloodGroup::OPositive, None))
        .await
        .unwrap();
    let b = store
        .register(donor("Bala", "bala@example.com", BloodGroup::APositive, None))
        .await
        .unwrap();

    for _ in 0..2 {
        let d = store
            .schedule(schedule(a.id, BloodGroup::OPositive, 1), MismatchPolicy::Reject)
            .await
            .unwrap();
        store.complete(d.id, None).await.unwrap();
    }
    let pending = store
        .schedule(schedule(b.id, BloodGroup::APositive, 3), MismatchPolicy::Reject)
        .await
        .unwrap();
    store.cancel(pending.id).await.unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let stats = DonationRecorder::statistics(&store, today).await.unwrap();
    assert_eq!(stats.total_donations, 2);
    assert_eq!(stats.recent_donations, 2);
    assert_eq!(stats.top_donors.len(), 1);
    assert_eq!(stats.top_donors[0].name, "Asha");

    let completed = store.completed_by_blood_group(BloodGroup::OPositive).await.unwrap();
    assert_eq!(completed.len(), 2);
    assert_eq!(completed[0].donor_name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let store = InMemoryStore::new();
    store
        .register(donor("Asha", "asha@example.com", BloodGroup::OPositive, None))
        .await
        .unwrap();
    let err = domain(
        store
            .register(donor("Asha 2", "ASHA@Example.com", BloodGroup::OPositive, None))
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, DomainError::AlreadyExists(_)));

    let found = store.find_by_email(" Asha@EXAMPLE.com").await.unwrap();
    assert_eq!(found.map(|u| u.name), Some("Asha".to_string()));
}

#[tokio::test]
async fn profile_update_is_partial() {
    let store = InMemoryStore::new();
    let user = store
        .register(donor("Asha", "asha@example.com", BloodGroup::OPositive, Some("Mysuru")))
        .await
        .unwrap();
    let updated = store
        .update_profile(
            user.id,
            ProfileUpdate {
                city: Some("Bengaluru".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.city.as_deref(), Some("Bengaluru"));
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));

    assert!(store.update_profile(UserId::new(77), ProfileUpdate::default()).await.is_err());
}

#[tokio::test]
async fn request_queries_filter_and_order() {
    let store = InMemoryStore::new();
    let here = store
        .register(donor("Hema", "hema@example.com", BloodGroup::OPositive, Some("Mysuru")))
        .await
        .unwrap();
    let there = store
        .register(donor("Tara", "tara@example.com", BloodGroup::OPositive, Some("Delhi")))
        .await
        .unwrap();

    let low = store.create(request(Some(here.id), BloodGroup::OPositive, UrgencyLevel::Low)).await.unwrap();
    let emergency = store
        .create(request(Some(there.id), BloodGroup::OPositive, UrgencyLevel::Emergency))
        .await
        .unwrap();
    let high = store.create(request(Some(here.id), BloodGroup::APositive, UrgencyLevel::High)).await.unwrap();

    let by_group = store.pending_by_blood_group(BloodGroup::OPositive).await.unwrap();
    let ids: Vec<_> = by_group.iter().map(|v| v.request.id).collect();
    assert_eq!(ids, vec![emergency.id, low.id]);

    let local = store.pending_by_location(Some("mysuru".to_string()), None).await.unwrap();
    assert_eq!(local.len(), 2);
    assert!(local.iter().all(|v| v.requester_city.as_deref() == Some("Mysuru")));

    let urgent = store.urgent().await.unwrap();
    let ids: Vec<_> = urgent.iter().map(|v| v.request.id).collect();
    assert_eq!(ids, vec![emergency.id, high.id]);

    store.update_status(emergency.id, RequestStatus::Fulfilled).await.unwrap();
    assert_eq!(store.urgent().await.unwrap().len(), 1);

    let view = RequestDirectory::get(&store, low.id).await.unwrap();
    assert_eq!(view.requester_name.as_deref(), Some("Hema"));
}

#[tokio::test]
async fn deleting_a_request_unlinks_donations() {
    let store = seeded().await;
    let user = store
        .register(donor("Asha", "asha@example.com", BloodGroup::OPositive, None))
        .await
        .unwrap();
    let req = store.create(request(None, BloodGroup::OPositive, UrgencyLevel::Medium)).await.unwrap();
    let mut cmd = schedule(user.id, BloodGroup::OPositive, 1);
    cmd.request_id = Some(req.id);
    let d = store.schedule(cmd, MismatchPolicy::Reject).await.unwrap();

    RequestDirectory::delete(&store, req.id).await.unwrap();
    let views = store.by_donor(user.id).await.unwrap();
    assert_eq!(views[0].donation.id, d.id);
    assert_eq!(views[0].donation.request_id, None);
    assert!(RequestDirectory::delete(&store, req.id).await.is_err());
}

#[tokio::test]
async fn contact_inbox_lifecycle() {
    let store = InMemoryStore::new();
    let first = store
        .submit(NewContactMessage {
            name: "Nila".to_string(),
            email: "nila@example.org".to_string(),
            phone: None,
            message: "Can I donate after travel?".to_string(),
        })
        .await
        .unwrap();
    let second = store
        .submit(NewContactMessage {
            name: "Omar".to_string(),
            email: "omar@example.org".to_string(),
            phone: Some(" ".to_string()),
            message: "Thanks!".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(second.phone, None);

    store.set_status(first.id, ContactStatus::Replied).await.unwrap();
    let unread = store.unread().await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, second.id);

    let all = ContactInbox::list_all(&store).await.unwrap();
    assert_eq!(all[0].id, second.id);

    let stats = ContactInbox::statistics(&store, Utc::now()).await.unwrap();
    assert_eq!((stats.total, stats.unread, stats.replied, stats.recent), (2, 1, 1, 2));

    ContactInbox::delete(&store, second.id).await.unwrap();
    let err = domain(ContactInbox::get(&store, second.id).await.unwrap_err());
    assert_eq!(err, DomainError::NotFound("Message not found".to_string()));
}

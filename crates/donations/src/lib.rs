//! Donation recording.
//!
//! Scheduling rules, the Scheduled → Completed/Cancelled lifecycle and
//! donation statistics. Pure domain logic; stores decide atomicity.

pub mod donation;
pub mod stats;

pub use donation::{
    DonationRecord, DonationStatus, DonationView, MismatchOutcome, MismatchPolicy,
    ScheduleDonation, check_donor_blood_group,
};
pub use stats::{BloodGroupTotals, DonationStatistics, RECENT_WINDOW_DAYS, TOP_DONORS_LIMIT, TopDonor};

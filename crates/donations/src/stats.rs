//! Donation statistics over completed donations.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use bloodbank_core::{BloodGroup, UserId};

use crate::donation::{DonationRecord, DonationStatus};

/// Completed donations dated within this many days count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 30;

pub const TOP_DONORS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BloodGroupTotals {
    pub blood_group: BloodGroup,
    pub count: u64,
    pub total_units: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopDonor {
    pub donor_id: UserId,
    pub name: String,
    pub donation_count: u64,
    pub total_units: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationStatistics {
    pub total_donations: u64,
    pub donations_by_blood_group: Vec<BloodGroupTotals>,
    pub recent_donations: u64,
    pub top_donors: Vec<TopDonor>,
}

impl DonationStatistics {
    /// Compute statistics from raw records. Donors unknown to `donor_name`
    /// are left out of the top-donor ranking.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a DonationRecord>,
        donor_name: impl Fn(UserId) -> Option<String>,
        today: NaiveDate,
    ) -> Self {
        let cutoff = today - chrono::Duration::days(RECENT_WINDOW_DAYS);

        let mut total = 0u64;
        let mut recent = 0u64;
        let mut by_group: BTreeMap<BloodGroup, (u64, u64)> = BTreeMap::new();
        let mut by_donor: HashMap<UserId, (u64, u64)> = HashMap::new();

        for d in records.into_iter().filter(|d| d.status == DonationStatus::Completed) {
            total += 1;
            if d.donation_date >= cutoff {
                recent += 1;
            }
            let g = by_group.entry(d.blood_group).or_default();
            g.0 += 1;
            g.1 += u64::from(d.units_donated);
            let u = by_donor.entry(d.donor_id).or_default();
            u.0 += 1;
            u.1 += u64::from(d.units_donated);
        }

        let mut top_donors: Vec<TopDonor> = by_donor
            .into_iter()
            .filter_map(|(donor_id, (count, units))| {
                donor_name(donor_id).map(|name| TopDonor {
                    donor_id,
                    name,
                    donation_count: count,
                    total_units: units,
                })
            })
            .collect();
        top_donors.sort_by(|a, b| {
            b.donation_count
                .cmp(&a.donation_count)
                .then_with(|| a.donor_id.cmp(&b.donor_id))
        });
        top_donors.truncate(TOP_DONORS_LIMIT);

        Self {
            total_donations: total,
            donations_by_blood_group: by_group
                .into_iter()
                .map(|(blood_group, (count, total_units))| BloodGroupTotals {
                    blood_group,
                    count,
                    total_units,
                })
                .collect(),
            recent_donations: recent,
            top_donors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::donation::ScheduleDonation;
    use bloodbank_core::DonationId;
    use chrono::Utc;

    fn donation(id: i64, donor: i64, group: BloodGroup, units: u32, date: NaiveDate, done: bool) -> DonationRecord {
        let mut d = DonationRecord::scheduled(
            DonationId::new(id),
            ScheduleDonation {
                donor_id: UserId::new(donor),
                request_id: None,
                donation_date: date,
                blood_group: group,
                units_donated: units,
                donation_center: None,
                notes: None,
            },
            Utc::now(),
        );
        if done {
            d.complete(None, Utc::now()).unwrap();
        }
        d
    }

    #[test]
    fn only_completed_donations_count() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let old = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let records = vec![
            donation(1, 1, BloodGroup::OPositive, 2, today, true),
            donation(2, 1, BloodGroup::OPositive, 1, old, true),
            donation(3, 2, BloodGroup::ANegative, 1, today, true),
            donation(4, 2, BloodGroup::ANegative, 5, today, false),
        ];

        let stats = DonationStatistics::from_records(
            &records,
            |id| Some(format!("donor-{id}")),
            today,
        );

        assert_eq!(stats.total_donations, 3);
        assert_eq!(stats.recent_donations, 2);
        assert_eq!(
            stats.donations_by_blood_group,
            vec![
                BloodGroupTotals { blood_group: BloodGroup::ANegative, count: 1, total_units: 1 },
                BloodGroupTotals { blood_group: BloodGroup::OPositive, count: 2, total_units: 3 },
            ]
        );
        assert_eq!(stats.top_donors[0].donor_id, UserId::new(1));
        assert_eq!(stats.top_donors[0].donation_count, 2);
        assert_eq!(stats.top_donors[0].total_units, 3);
    }

    #[test]
    fn serializes_with_camel_case_top_level_keys() {
        let stats = DonationStatistics::from_records(&[], |_| None, Utc::now().date_naive());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalDonations"], 0);
        assert!(json["topDonors"].as_array().unwrap().is_empty());
    }
}

//! Read-side summaries over the ledger.

use serde::Serialize;

use bloodbank_core::BloodGroup;

use crate::ledger::LedgerEntry;

/// A blood group together with its available units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub blood_group: BloodGroup,
    pub available_units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatistics {
    pub total_available: u64,
    pub total_reserved: u64,
    pub highest_available: Option<StockLevel>,
    pub lowest_available: Option<StockLevel>,
    /// Entries strictly below the critical threshold.
    pub critical_stock_count: u64,
}

impl InventoryStatistics {
    pub fn from_entries(entries: &[LedgerEntry], critical_threshold: u32) -> Self {
        let level = |e: &LedgerEntry| StockLevel {
            blood_group: e.blood_group(),
            available_units: e.available_units(),
        };

        // Ties resolve to the first entry in blood-group order.
        let mut sorted: Vec<&LedgerEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.blood_group());
        let highest = sorted
            .iter()
            .copied()
            .reduce(|best, e| if e.available_units() > best.available_units() { e } else { best });
        let lowest = sorted
            .iter()
            .copied()
            .reduce(|best, e| if e.available_units() < best.available_units() { e } else { best });

        Self {
            total_available: entries.iter().map(|e| u64::from(e.available_units())).sum(),
            total_reserved: entries.iter().map(|e| u64::from(e.reserved_units())).sum(),
            highest_available: highest.map(level),
            lowest_available: lowest.map(level),
            critical_stock_count: entries
                .iter()
                .filter(|e| e.available_units() < critical_threshold)
                .count() as u64,
        }
    }
}

/// Entries at or below `threshold`, lowest supply first.
pub fn low_stock(entries: &[LedgerEntry], threshold: u32) -> Vec<LedgerEntry> {
    let mut low: Vec<LedgerEntry> = entries
        .iter()
        .filter(|e| e.available_units() <= threshold)
        .cloned()
        .collect();
    low.sort_by_key(|e| (e.available_units(), e.blood_group()));
    low
}

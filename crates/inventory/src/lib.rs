//! Blood inventory ledger.
//!
//! This crate contains the per-blood-group counter rules, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage). Stores apply
//! these operations inside their own atomicity boundary.

pub mod ledger;
pub mod stats;

pub use ledger::{LedgerEntry, MAX_UNITS, ensure_positive_units};
pub use stats::{InventoryStatistics, StockLevel, low_stock};

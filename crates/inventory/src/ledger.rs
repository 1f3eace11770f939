use chrono::{DateTime, Utc};
use serde::Serialize;

use bloodbank_core::{BloodGroup, DomainError, DomainResult};

/// Upper bound for any counter (matches the storage column type).
pub const MAX_UNITS: u32 = i32::MAX as u32;

/// Per-blood-group supply counters.
///
/// # Invariants
/// - `available_units` and `reserved_units` are never negative (unsigned).
/// - Counters change only through [`reserve`](Self::reserve),
///   [`release`](Self::release), [`add`](Self::add) and
///   [`set_counts`](Self::set_counts). A failed operation leaves the entry
///   untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    blood_group: BloodGroup,
    available_units: u32,
    reserved_units: u32,
    last_updated: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a fresh entry (the `initialize` operation).
    pub fn new(
        blood_group: BloodGroup,
        available_units: u32,
        reserved_units: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_within_bounds(available_units, "available units")?;
        ensure_within_bounds(reserved_units, "reserved units")?;
        Ok(Self {
            blood_group,
            available_units,
            reserved_units,
            last_updated: now,
        })
    }

    /// Rehydrate an entry from storage.
    pub fn from_storage(
        blood_group: BloodGroup,
        available_units: u32,
        reserved_units: u32,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            blood_group,
            available_units,
            reserved_units,
            last_updated,
        }
    }

    pub fn not_found() -> DomainError {
        DomainError::not_found("Blood group not found in inventory")
    }

    pub fn already_initialized() -> DomainError {
        DomainError::already_exists("Blood group already exists in inventory")
    }

    pub fn blood_group(&self) -> BloodGroup {
        self.blood_group
    }

    pub fn available_units(&self) -> u32 {
        self.available_units
    }

    pub fn reserved_units(&self) -> u32 {
        self.reserved_units
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Move `units` from available to reserved.
    pub fn reserve(&mut self, units: u32, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive_units(units)?;
        if self.available_units < units {
            return Err(DomainError::InsufficientStock {
                blood_group: self.blood_group,
                available: self.available_units,
            });
        }
        let reserved = checked_add(self.reserved_units, units, "reserved units")?;

        self.available_units -= units;
        self.reserved_units = reserved;
        self.last_updated = now;
        Ok(())
    }

    /// Move `units` from reserved back to available.
    pub fn release(&mut self, units: u32, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive_units(units)?;
        if self.reserved_units < units {
            return Err(DomainError::InsufficientReservation {
                blood_group: self.blood_group,
                reserved: self.reserved_units,
            });
        }
        let available = checked_add(self.available_units, units, "available units")?;

        self.reserved_units -= units;
        self.available_units = available;
        self.last_updated = now;
        Ok(())
    }

    /// Increase available supply (donations, deliveries).
    pub fn add(&mut self, units: u32, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive_units(units)?;
        self.available_units = checked_add(self.available_units, units, "available units")?;
        self.last_updated = now;
        Ok(())
    }

    /// Administrative overwrite. No cross-check against outstanding reservations.
    pub fn set_counts(&mut self, available: u32, reserved: u32, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_within_bounds(available, "available units")?;
        ensure_within_bounds(reserved, "reserved units")?;
        self.available_units = available;
        self.reserved_units = reserved;
        self.last_updated = now;
        Ok(())
    }
}

/// Unit counts for reserve/release/add must be strictly positive.
pub fn ensure_positive_units(units: u32) -> DomainResult<()> {
    if units == 0 {
        return Err(DomainError::validation("units must be a positive integer"));
    }
    ensure_within_bounds(units, "units")
}

fn ensure_within_bounds(value: u32, what: &str) -> DomainResult<()> {
    if value > MAX_UNITS {
        return Err(DomainError::validation(format!("{what} exceeds {MAX_UNITS}")));
    }
    Ok(())
}

fn checked_add(current: u32, units: u32, what: &str) -> DomainResult<u32> {
    current
        .checked_add(units)
        .filter(|v| *v <= MAX_UNITS)
        .ok_or_else(|| DomainError::validation(format!("{what} would exceed {MAX_UNITS}")))
}

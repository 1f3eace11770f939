//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A blood group is
/// the canonical example in this domain: `O+` is `O+` wherever it appears, and
/// donation records reference ledger entries only through that value.
///
/// The trait requires:
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: compared by their attribute values
/// - **Debug**: debuggable in logs and tests
///
/// Implementors also provide a canonical textual form, used as the storage
/// and wire representation.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {
    /// Canonical string representation (stable across storage and transport).
    fn canonical(&self) -> &'static str;
}

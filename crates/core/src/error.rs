//! Domain error model.

use thiserror::Error;

use crate::blood_group::BloodGroup;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a [`DomainError`], used by transports to pick a
/// status code without matching every variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The request is well-formed but conflicts with current state.
    StateConflict,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("{0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("{0}")]
    NotFound(String),

    /// Not enough available units to satisfy a reservation.
    #[error("Insufficient {blood_group} blood units. Available: {available}")]
    InsufficientStock { blood_group: BloodGroup, available: u32 },

    /// Not enough reserved units to satisfy a release.
    #[error("Insufficient reserved {blood_group} blood units. Reserved: {reserved}")]
    InsufficientReservation { blood_group: BloodGroup, reserved: u32 },

    /// The donor's recorded blood group differs from the one supplied.
    #[error("Blood group does not match donor record (recorded {recorded}, supplied {supplied})")]
    BloodGroupMismatch { recorded: BloodGroup, supplied: BloodGroup },

    /// The entity being created already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// A lifecycle transition is not allowed from the current state.
    #[error("{0}")]
    InvalidTransition(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::Validation,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::InsufficientStock { .. }
            | DomainError::InsufficientReservation { .. }
            | DomainError::BloodGroupMismatch { .. }
            | DomainError::AlreadyExists(_)
            | DomainError::InvalidTransition(_) => ErrorKind::StateConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_errors_are_state_conflicts() {
        let err = DomainError::InsufficientStock {
            blood_group: BloodGroup::OPositive,
            available: 2,
        };
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(err.to_string(), "Insufficient O+ blood units. Available: 2");
    }

    #[test]
    fn invalid_id_is_a_validation_error() {
        assert_eq!(DomainError::invalid_id("x").kind(), ErrorKind::Validation);
        assert_eq!(DomainError::not_found("gone").kind(), ErrorKind::NotFound);
    }
}

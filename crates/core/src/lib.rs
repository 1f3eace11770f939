//! Domain foundation building blocks shared by every bloodbank crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod blood_group;
pub mod error;
pub mod id;
pub mod value_object;

pub use blood_group::BloodGroup;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{DonationId, MessageId, RequestId, UserId};
pub use value_object::ValueObject;

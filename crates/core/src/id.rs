//! Strongly-typed identifiers used across the domain.
//!
//! Records are keyed by database-assigned integers, so every id wraps an `i64`.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a registered user (donor and/or recipient).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a donation record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(i64);

/// Identifier of a blood request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(i64);

/// Identifier of a contact message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!("{}: must be positive", $name)));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(UserId, "UserId");
impl_int_newtype!(DonationId, "DonationId");
impl_int_newtype!(RequestId, "RequestId");
impl_int_newtype!(MessageId, "MessageId");

//! ABO/Rh blood groups.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// One of the eight canonical ABO/Rh blood groups.
///
/// The textual form (`"A+"`, `"AB-"`, ...) is what goes on the wire and into
/// storage; ordering follows [`BloodGroup::ALL`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BloodGroup {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl ValueObject for BloodGroup {
    fn canonical(&self) -> &'static str {
        self.as_str()
    }
}

impl core::fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid blood group '{}': expected one of A+, A-, B+, B-, AB+, AB-, O+, O-",
                    s.trim()
                ))
            })
    }
}

impl Serialize for BloodGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BloodGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

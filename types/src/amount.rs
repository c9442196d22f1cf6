//! Output amounts.
//!
//! Amounts are positive integers bounded by [`Amount::MAX`] and are carried
//! on the wire as decimal strings (JSON numbers cannot represent the full
//! range losslessly in every consumer).

use crate::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An amount of an asset locked by an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    /// Largest representable amount: 9 × 10^18.
    pub const MAX: u64 = 9_000_000_000_000_000_000;

    /// Construct a checked amount. Zero and out-of-range values are rejected.
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::Amount {
                reason: "`amount` must be greater than 0".into(),
            });
        }
        if value > Self::MAX {
            return Err(ValidationError::Amount {
                reason: format!("`amount` must be <= {}", Self::MAX),
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<u64> {
        amounts
            .into_iter()
            .try_fold(0u64, |acc, a| acc.checked_add(a.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value: u64 = s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {s}")))?;
        Amount::new(value).map_err(serde::de::Error::custom)
    }
}

//! Dense integer identifiers
//!
//! Every entity is addressed by its index into the World's arena. Ids are
//! never reused: dead firms keep their slot, entrants are appended.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! dense_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

dense_id!(FirmId, "F");
dense_id!(HouseholdId, "H");
dense_id!(BankId, "B");

/// A deposit account holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Account {
    Household(HouseholdId),
    Firm(FirmId),
    /// Held at the central bank, outside the commercial banking system
    Government,
}

/// House bank of a depositor: `id mod bank_count`
pub fn house_bank(id: usize, bank_count: usize) -> BankId {
    BankId(id % bank_count.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(FirmId(3).to_string(), "F3");
        assert_eq!(HouseholdId(10).to_string(), "H10");
        assert_eq!(BankId(0).to_string(), "B0");
    }

    #[test]
    fn test_house_bank_round_robin() {
        assert_eq!(house_bank(0, 3), BankId(0));
        assert_eq!(house_bank(4, 3), BankId(1));
    }
}

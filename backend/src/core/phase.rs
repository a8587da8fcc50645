//! The thirteen phases of one period, in execution order
//!
//! Each phase has a stable numeric tag. Tags name random substreams and
//! appear in error reports; 0 is reserved for initialisation.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    ResetFlows,
    PolicyRate,
    LendingTerms,
    CreditMarket,
    FirmPlanning,
    LabourMarket,
    Production,
    HouseholdIncome,
    GoodsMarket,
    Taxes,
    GovernmentBudget,
    InflationUpdate,
    ExitEntryRecord,
}

impl Phase {
    pub const ALL: [Phase; 13] = [
        Phase::ResetFlows,
        Phase::PolicyRate,
        Phase::LendingTerms,
        Phase::CreditMarket,
        Phase::FirmPlanning,
        Phase::LabourMarket,
        Phase::Production,
        Phase::HouseholdIncome,
        Phase::GoodsMarket,
        Phase::Taxes,
        Phase::GovernmentBudget,
        Phase::InflationUpdate,
        Phase::ExitEntryRecord,
    ];

    /// Tag used for substreams and diagnostics (1..=13)
    pub fn tag(self) -> u8 {
        self as u8 + 1
    }

    /// Tag for a second, independent draw sequence within the same phase
    pub fn secondary_tag(self) -> u8 {
        self.tag() + 100
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::ResetFlows => "reset_flows",
            Phase::PolicyRate => "policy_rate",
            Phase::LendingTerms => "lending_terms",
            Phase::CreditMarket => "credit_market",
            Phase::FirmPlanning => "firm_planning",
            Phase::LabourMarket => "labour_market",
            Phase::Production => "production",
            Phase::HouseholdIncome => "household_income",
            Phase::GoodsMarket => "goods_market",
            Phase::Taxes => "taxes",
            Phase::GovernmentBudget => "government_budget",
            Phase::InflationUpdate => "inflation_update",
            Phase::ExitEntryRecord => "exit_entry_record",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag(), self.name())
    }
}

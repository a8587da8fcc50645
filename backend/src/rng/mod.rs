//! Deterministic random number generation
//!
//! Uses xorshift64* for the generator and splitmix64 to derive independent
//! substreams per (seed, agent, period, phase).
//! CRITICAL: All randomness in the simulator MUST go through this module.

mod sampling;
mod xorshift;

pub use xorshift::RngManager;

use crate::models::ids::{BankId, FirmId, HouseholdId};

/// Identifies who owns a random substream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKey {
    /// Orchestrator-level draws (entry, population synthesis)
    System,
    Firm(usize),
    Household(usize),
    Bank(usize),
}

impl StreamKey {
    pub(crate) fn encode(self) -> u64 {
        match self {
            StreamKey::System => 0,
            StreamKey::Firm(id) => (1u64 << 60) | id as u64,
            StreamKey::Household(id) => (2u64 << 60) | id as u64,
            StreamKey::Bank(id) => (3u64 << 60) | id as u64,
        }
    }
}

impl From<FirmId> for StreamKey {
    fn from(id: FirmId) -> Self {
        StreamKey::Firm(id.index())
    }
}

impl From<HouseholdId> for StreamKey {
    fn from(id: HouseholdId) -> Self {
        StreamKey::Household(id.index())
    }
}

impl From<BankId> for StreamKey {
    fn from(id: BankId) -> Self {
        StreamKey::Bank(id.index())
    }
}

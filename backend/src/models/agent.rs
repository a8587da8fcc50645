//! Uniform agent interface
//!
//! All five agent kinds expose the same two capabilities: a `step` that
//! turns a read-only context plus the agent's own substream into a decision,
//! and a `snapshot` used for micro-level output and inspection. Each kind
//! picks its own context and effect types; agents never hold references to
//! each other, only ids resolved through the World.

use serde::{Deserialize, Serialize};

use super::bank::Bank;
use super::central_bank::CentralBank;
use super::firm::Firm;
use super::government::Government;
use super::household::Household;
use crate::rng::RngManager;

pub trait Agent {
    /// Read-only inputs for one decision
    type Context<'a>;
    /// Decision handed back to the orchestrator
    type Effects;

    fn step(&mut self, ctx: &Self::Context<'_>, rng: &mut RngManager) -> Self::Effects;

    fn snapshot(&self) -> AgentSnapshot;
}

/// Point-in-time copy of one agent's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state")]
pub enum AgentSnapshot {
    Firm(Firm),
    Household(Household),
    Bank(Bank),
    CentralBank(CentralBank),
    Government(Government),
}

impl AgentSnapshot {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentSnapshot::Firm(_) => "Firm",
            AgentSnapshot::Household(_) => "Household",
            AgentSnapshot::Bank(_) => "Bank",
            AgentSnapshot::CentralBank(_) => "CentralBank",
            AgentSnapshot::Government(_) => "Government",
        }
    }
}

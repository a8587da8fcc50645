//! Event logging for auditing and analysis
//!
//! Events capture the discrete outcomes a run produces besides its
//! aggregates: credit decisions, labour-market moves, defaults and
//! firm turnover. Rejections and bankruptcies are normal outcomes and are
//! recorded here as data, never raised as errors.
//!
//! # Example
//!
//! ```rust
//! use macro_abm_core_rs::models::event::{Event, EventLog};
//! use macro_abm_core_rs::models::ids::{FirmId, HouseholdId};
//!
//! let mut log = EventLog::new();
//! log.log(Event::Hired { period: 3, firm: FirmId(1), household: HouseholdId(7), wage: 9_000.0 });
//! assert_eq!(log.events_in_period(3).len(), 1);
//! assert_eq!(log.events()[0].event_type(), "Hired");
//! ```

use serde::{Deserialize, Serialize};

use super::bank::RejectionReason;
use super::ids::{BankId, FirmId, HouseholdId};
use crate::markets::Market;

/// Simulation event, tagged with the period it occurred in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LoanApproved {
        period: usize,
        bank: BankId,
        firm: FirmId,
        amount: f64,
        rate: f64,
    },

    LoanRejected {
        period: usize,
        bank: BankId,
        firm: FirmId,
        amount: f64,
        reason: RejectionReason,
    },

    /// Outstanding principal of an exiting firm, split into recovery and
    /// write-off
    LoanDefault {
        period: usize,
        bank: BankId,
        firm: FirmId,
        recovered: f64,
        written_off: f64,
    },

    Hired {
        period: usize,
        firm: FirmId,
        household: HouseholdId,
        wage: f64,
    },

    /// Exogenous separation
    Separated {
        period: usize,
        firm: FirmId,
        household: HouseholdId,
    },

    /// Firm-initiated layoff
    LaidOff {
        period: usize,
        firm: FirmId,
        household: HouseholdId,
    },

    FirmExit {
        period: usize,
        firm: FirmId,
        equity: f64,
    },

    FirmEntry {
        period: usize,
        firm: FirmId,
        template: FirmId,
    },

    MarketStarvation {
        period: usize,
        market: Market,
    },

    CapitalShortfall {
        period: usize,
        bank: BankId,
        capital_ratio: f64,
    },
}

impl Event {
    /// Period in which this event occurred
    pub fn period(&self) -> usize {
        match self {
            Event::LoanApproved { period, .. } => *period,
            Event::LoanRejected { period, .. } => *period,
            Event::LoanDefault { period, .. } => *period,
            Event::Hired { period, .. } => *period,
            Event::Separated { period, .. } => *period,
            Event::LaidOff { period, .. } => *period,
            Event::FirmExit { period, .. } => *period,
            Event::FirmEntry { period, .. } => *period,
            Event::MarketStarvation { period, .. } => *period,
            Event::CapitalShortfall { period, .. } => *period,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::LoanApproved { .. } => "LoanApproved",
            Event::LoanRejected { .. } => "LoanRejected",
            Event::LoanDefault { .. } => "LoanDefault",
            Event::Hired { .. } => "Hired",
            Event::Separated { .. } => "Separated",
            Event::LaidOff { .. } => "LaidOff",
            Event::FirmExit { .. } => "FirmExit",
            Event::FirmEntry { .. } => "FirmEntry",
            Event::MarketStarvation { .. } => "MarketStarvation",
            Event::CapitalShortfall { .. } => "CapitalShortfall",
        }
    }

    /// Firm the event concerns, if any
    pub fn firm(&self) -> Option<FirmId> {
        match self {
            Event::LoanApproved { firm, .. }
            | Event::LoanRejected { firm, .. }
            | Event::LoanDefault { firm, .. }
            | Event::Hired { firm, .. }
            | Event::Separated { firm, .. }
            | Event::LaidOff { firm, .. }
            | Event::FirmExit { firm, .. }
            | Event::FirmEntry { firm, .. } => Some(*firm),
            _ => None,
        }
    }
}

/// Append-only event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Move every event out of `other`, keeping order
    pub fn append(&mut self, other: &mut EventLog) {
        self.events.append(&mut other.events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_in_period(&self, period: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.period() == period).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_firm(&self, firm: FirmId) -> Vec<&Event> {
        self.events.iter().filter(|e| e.firm() == Some(firm)).collect()
    }

    /// Count events of one type in one period
    pub fn count(&self, period: usize, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.period() == period && e.event_type() == event_type)
            .count()
    }
}

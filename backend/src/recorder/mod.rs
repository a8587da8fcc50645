//! Recorder: the append-only output of a run
//!
//! One [`MacroRecord`] per committed period. Records are built from the
//! World at the end of phase 13 and never touched again; the sequence is
//! the only artifact downstream analysis reads.
//!
//! # Critical Invariants
//!
//! 1. Record `i` describes period `i + 1` (periods are 1-based)
//! 2. Records are appended only for fully committed periods

pub mod accounting;
pub mod evaluation;

use serde::{Deserialize, Serialize};

pub use accounting::{BankEquityCheck, StockFlowCheck};
pub use evaluation::{CalibrationReport, SummaryStatistics, Target};

use crate::models::state::World;

/// Aggregates of one committed period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub period: usize,
    /// Nominal GDP: value of goods sold
    pub gdp: f64,
    pub real_gdp: f64,
    pub price_index: f64,
    /// Per-period change in the price index
    pub inflation: f64,
    pub unemployment_rate: f64,
    pub average_wage: f64,
    /// Annual policy rate set for this period
    pub policy_rate: f64,
    pub government_deficit: f64,
    pub government_debt: f64,
    /// Loan book across all banks at period close
    pub total_lending: f64,
    pub new_lending: f64,
    pub loan_rejections: usize,
    pub firm_bankruptcies: usize,
    pub firm_entries: usize,
    pub total_employment: usize,
    pub live_firms: usize,
    pub money_stock: f64,
    /// Financial net worth summed over all sectors (zero when consistent)
    pub stock_flow_residual: f64,
}

/// Period counts the World does not keep
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodActivity {
    pub new_lending: f64,
    pub loan_rejections: usize,
    pub firm_bankruptcies: usize,
    pub firm_entries: usize,
}

impl MacroRecord {
    /// Build the record for `period` from a World whose stats are current
    pub fn capture(
        period: usize,
        world: &World,
        inflation: f64,
        activity: PeriodActivity,
    ) -> Self {
        let stats = world.stats();
        Self {
            period,
            gdp: stats.nominal_gdp,
            real_gdp: stats.real_gdp,
            price_index: stats.price_index,
            inflation,
            unemployment_rate: stats.unemployment_rate,
            average_wage: stats.average_wage,
            policy_rate: world.central_bank().policy_rate(),
            government_deficit: world.government().deficit(),
            government_debt: world.government().debt(),
            total_lending: world.total_loans(),
            new_lending: activity.new_lending,
            loan_rejections: activity.loan_rejections,
            firm_bankruptcies: activity.firm_bankruptcies,
            firm_entries: activity.firm_entries,
            total_employment: world.employed_count(),
            live_firms: world.live_firm_count(),
            money_stock: world.money_stock(),
            stock_flow_residual: world.sector_balances().total(),
        }
    }
}

/// Ordered, append-only sequence of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recorder {
    records: Vec<MacroRecord>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: MacroRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MacroRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&MacroRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<MacroRecord> {
        self.records
    }

    pub fn gdp_series(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.gdp).collect()
    }

    pub fn inflation_series(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.inflation).collect()
    }

    pub fn unemployment_series(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.unemployment_rate).collect()
    }
}

//! Household agent
//!
//! # Critical Invariants
//!
//! 1. `wealth >= 0` (households hold deposits only, never overdrafts)
//! 2. `employer`, if present, references a live firm that lists this
//!    household among its employees

use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentSnapshot};
use super::ids::{BankId, FirmId, HouseholdId};
use crate::rng::RngManager;

/// Externally supplied initial attributes of one household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdSample {
    pub region: usize,
    /// Income decile 1..=10 of the initial income distribution
    pub income_decile: u8,
    pub wealth: f64,
    pub propensity_to_consume: f64,
    pub reservation_wage: f64,
    /// Initial employer, as an index into the firm samples
    pub employer: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdFlows {
    pub wage_income: f64,
    pub benefit_income: f64,
    pub interest_income: f64,
    pub dividend_income: f64,
    pub planned_consumption: f64,
    pub consumption: f64,
    pub tax_paid: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct HouseholdContext {
    pub income_tax_rate: f64,
    pub wealth_draw_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub(crate) id: HouseholdId,
    pub(crate) region: usize,
    pub(crate) income_decile: u8,
    pub(crate) house_bank: BankId,
    pub(crate) wealth: f64,
    pub(crate) employer: Option<FirmId>,
    /// Contract wage (0 while unemployed)
    pub(crate) wage: f64,
    pub(crate) reservation_wage: f64,
    pub(crate) propensity_to_consume: f64,
    /// Dividends received last period; they arrive after this period's
    /// spending is planned, so plans use the previous payout
    pub(crate) last_dividends: f64,
    pub(crate) flows: HouseholdFlows,
}

impl Household {
    pub fn from_sample(id: HouseholdId, sample: &HouseholdSample, house_bank: BankId) -> Self {
        Self {
            id,
            region: sample.region,
            income_decile: sample.income_decile,
            house_bank,
            wealth: sample.wealth,
            employer: None,
            wage: 0.0,
            reservation_wage: sample.reservation_wage,
            propensity_to_consume: sample.propensity_to_consume,
            last_dividends: 0.0,
            flows: HouseholdFlows::default(),
        }
    }

    pub fn id(&self) -> HouseholdId {
        self.id
    }

    pub fn region(&self) -> usize {
        self.region
    }

    pub fn income_decile(&self) -> u8 {
        self.income_decile
    }

    pub fn house_bank(&self) -> BankId {
        self.house_bank
    }

    pub fn wealth(&self) -> f64 {
        self.wealth
    }

    pub fn employer(&self) -> Option<FirmId> {
        self.employer
    }

    pub fn is_employed(&self) -> bool {
        self.employer.is_some()
    }

    pub fn wage(&self) -> f64 {
        self.wage
    }

    pub fn reservation_wage(&self) -> f64 {
        self.reservation_wage
    }

    pub fn propensity_to_consume(&self) -> f64 {
        self.propensity_to_consume
    }

    pub fn flows(&self) -> &HouseholdFlows {
        &self.flows
    }

    pub fn last_dividends(&self) -> f64 {
        self.last_dividends
    }

    pub(crate) fn begin_period(&mut self) {
        self.last_dividends = self.flows.dividend_income;
        self.flows = HouseholdFlows::default();
    }

    pub(crate) fn take_job(&mut self, firm: FirmId, wage: f64) {
        self.employer = Some(firm);
        self.wage = wage;
        self.reservation_wage = wage;
    }

    pub(crate) fn lose_job(&mut self) {
        self.employer = None;
        self.wage = 0.0;
    }

    /// Lower the reservation wage after a fruitless search
    pub(crate) fn lower_reservation_wage(&mut self, decay: f64, floor: f64) {
        self.reservation_wage = (self.reservation_wage * (1.0 - decay)).max(floor);
    }

    /// Income tax that phase 10 will levy on this period's wages
    pub fn income_tax_due(&self, rate: f64) -> f64 {
        self.flows.wage_income * rate
    }
}

impl Agent for Household {
    type Context<'a> = HouseholdContext;
    type Effects = f64;

    /// Consumption plan: propensity times disposable income plus a wealth
    /// draw, never more than the household can pay after tax.
    fn step(&mut self, ctx: &HouseholdContext, _rng: &mut RngManager) -> f64 {
        let tax = self.income_tax_due(ctx.income_tax_rate);
        let income = self.flows.wage_income
            + self.flows.benefit_income
            + self.flows.interest_income
            + self.flows.dividend_income;
        let disposable = income + self.last_dividends - tax;
        let prior_wealth = (self.wealth - income - self.last_dividends).max(0.0);

        let desired =
            self.propensity_to_consume * disposable.max(0.0) + ctx.wealth_draw_rate * prior_wealth;
        let affordable = (self.wealth - tax).max(0.0);
        let plan = desired.min(affordable).max(0.0);

        self.flows.planned_consumption = plan;
        if self.employer.is_some() {
            self.reservation_wage = self.wage;
        }
        plan
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::Household(self.clone())
    }
}

//! Firm agent
//!
//! Firms plan output from smoothed demand expectations, price with an
//! adaptive markup over unit labour cost, hire through the labour market,
//! borrow working capital from banks, and exit after a run of consecutive
//! negative-equity periods.
//!
//! # Critical Invariants
//!
//! 1. `equity = capital + inventory * unit_cost + cash - debt`, computed on
//!    demand so it can never drift from its components
//! 2. `debt` equals the sum of principal the firm owes across all loan books
//! 3. `alive` implies `insolvency_counter < threshold`
//! 4. `inventory >= 0`; `cash` may be negative (an overdraft at the house bank)

use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentSnapshot};
use super::ids::{BankId, FirmId, HouseholdId};
use crate::config::ModelConfig;
use crate::rng::RngManager;

/// Externally supplied initial attributes of one firm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmSample {
    pub sector: usize,
    pub region: usize,
    /// Productive capital (currency units)
    pub capital: f64,
    pub cash: f64,
    pub debt: f64,
    /// Inventory in units of output
    pub inventory: f64,
    pub wage: f64,
    /// Output per worker per period
    pub productivity: f64,
    /// Initial sales expectation (units per period)
    pub expected_demand: f64,
    /// Last observed revenue (used by credit screening in period 1)
    pub revenue: f64,
}

/// Per-period flow counters, reset in phase 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmFlows {
    pub output: f64,
    pub units_sold: f64,
    pub revenue: f64,
    pub wage_bill: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub borrowed: f64,
    pub profit: f64,
    pub tax_paid: f64,
    pub dividends_paid: f64,
}

/// Planning outcome posted to the labour market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirmPlan {
    pub production_plan: f64,
    pub labour_demand: usize,
    pub vacancies: usize,
    pub layoffs: usize,
    pub price: f64,
    pub wage_offer: f64,
}

/// What a firm sees when it plans
#[derive(Debug, Clone, Copy)]
pub struct FirmContext<'a> {
    pub config: &'a ModelConfig,
    /// Average wage paid in the firm's sector last period (0 if unknown)
    pub sector_wage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firm {
    pub(crate) id: FirmId,
    pub(crate) sector: usize,
    pub(crate) region: usize,
    pub(crate) house_bank: BankId,
    pub(crate) capital: f64,
    pub(crate) cash: f64,
    pub(crate) debt: f64,
    pub(crate) inventory: f64,
    pub(crate) price: f64,
    pub(crate) wage: f64,
    pub(crate) markup: f64,
    pub(crate) productivity: f64,
    /// Workers per unit of output before the period shock
    pub(crate) labour_coefficient: f64,
    /// Multiplicative productivity shock drawn this period
    pub(crate) shock: f64,
    pub(crate) expected_demand: f64,
    /// Units demanded of this firm at the last clearing, shortfall included
    pub(crate) last_demand: f64,
    pub(crate) last_revenue: f64,
    pub(crate) production_plan: f64,
    pub(crate) labour_demand: usize,
    pub(crate) vacancies: usize,
    /// Sorted ascending
    pub(crate) employees: Vec<HouseholdId>,
    pub(crate) alive: bool,
    pub(crate) insolvency_counter: u32,
    pub(crate) born: usize,
    pub(crate) died: Option<usize>,
    pub(crate) flows: FirmFlows,
}

impl Firm {
    /// Build a firm from its initial sample
    pub fn from_sample(
        id: FirmId,
        sample: &FirmSample,
        house_bank: BankId,
        config: &ModelConfig,
        born: usize,
    ) -> Self {
        let labour_coefficient = config
            .sector_labour_coefficient(sample.sector)
            .unwrap_or_else(|| 1.0 / sample.productivity.max(f64::MIN_POSITIVE));
        let markup = config.firm.initial_markup;
        let price = sample.wage * labour_coefficient * (1.0 + markup);

        Self {
            id,
            sector: sample.sector,
            region: sample.region,
            house_bank,
            capital: sample.capital,
            cash: sample.cash,
            debt: sample.debt,
            inventory: sample.inventory,
            price,
            wage: sample.wage,
            markup,
            productivity: sample.productivity,
            labour_coefficient,
            shock: 1.0,
            expected_demand: sample.expected_demand,
            last_demand: sample.expected_demand,
            last_revenue: sample.revenue,
            production_plan: sample.expected_demand,
            labour_demand: 0,
            vacancies: 0,
            employees: Vec::new(),
            alive: true,
            insolvency_counter: 0,
            born,
            died: None,
            flows: FirmFlows::default(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> FirmId {
        self.id
    }

    pub fn sector(&self) -> usize {
        self.sector
    }

    pub fn region(&self) -> usize {
        self.region
    }

    pub fn house_bank(&self) -> BankId {
        self.house_bank
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn debt(&self) -> f64 {
        self.debt
    }

    pub fn inventory(&self) -> f64 {
        self.inventory
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn wage(&self) -> f64 {
        self.wage
    }

    pub fn markup(&self) -> f64 {
        self.markup
    }

    pub fn productivity(&self) -> f64 {
        self.productivity * self.shock
    }

    pub fn expected_demand(&self) -> f64 {
        self.expected_demand
    }

    pub fn last_demand(&self) -> f64 {
        self.last_demand
    }

    pub fn last_revenue(&self) -> f64 {
        self.last_revenue
    }

    pub fn production_plan(&self) -> f64 {
        self.production_plan
    }

    pub fn labour_demand(&self) -> usize {
        self.labour_demand
    }

    pub fn vacancies(&self) -> usize {
        self.vacancies
    }

    pub fn employees(&self) -> &[HouseholdId] {
        &self.employees
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn insolvency_counter(&self) -> u32 {
        self.insolvency_counter
    }

    pub fn born(&self) -> usize {
        self.born
    }

    pub fn died(&self) -> Option<usize> {
        self.died
    }

    pub fn flows(&self) -> &FirmFlows {
        &self.flows
    }

    /// Workers per unit of output this period
    pub fn effective_labour_coefficient(&self) -> f64 {
        self.labour_coefficient / self.shock
    }

    /// Labour cost of one unit of output
    pub fn unit_cost(&self) -> f64 {
        self.wage * self.effective_labour_coefficient()
    }

    pub fn inventory_value(&self) -> f64 {
        self.inventory * self.unit_cost()
    }

    /// Net worth: real assets at cost plus net financial position
    pub fn equity(&self) -> f64 {
        self.capital + self.inventory_value() + self.cash - self.debt
    }

    /// Maximum output per period allowed by the capital stock
    pub fn capacity(&self, config: &ModelConfig) -> f64 {
        self.capital * config.firm.capacity_per_capital
    }

    /// Wage bill at the current workforce and wage
    pub fn wage_bill(&self) -> f64 {
        self.wage * self.employees.len() as f64
    }

    // ========================================================================
    // Mutators used by shocks and test harnesses
    // ========================================================================

    /// Overwrite the posted price
    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }

    /// Scale base productivity (and the labour coefficient inversely)
    pub fn scale_productivity(&mut self, factor: f64) {
        self.productivity *= factor;
        self.labour_coefficient /= factor;
    }

    /// Overwrite the consecutive-insolvency counter
    pub fn set_insolvency_counter(&mut self, counter: u32) {
        self.insolvency_counter = counter;
    }

    // ========================================================================
    // Period behaviour
    // ========================================================================

    pub(crate) fn begin_period(&mut self) {
        self.flows = FirmFlows::default();
    }

    /// Produce as much of the plan as labour and capital allow
    pub(crate) fn produce(&mut self, config: &ModelConfig) -> f64 {
        let labour_output = self.employees.len() as f64 / self.effective_labour_coefficient();
        let output = self
            .production_plan
            .min(labour_output)
            .min(self.capacity(config))
            .max(0.0);
        self.inventory += output;
        self.flows.output = output;
        output
    }

    /// Book the outcome of goods-market clearing
    pub(crate) fn record_sales(&mut self, demanded_units: f64, sold_units: f64) {
        let revenue = sold_units * self.price;
        self.inventory = (self.inventory - sold_units).max(0.0);
        self.last_demand = demanded_units;
        self.last_revenue = revenue;
        self.flows.units_sold = sold_units;
        self.flows.revenue = revenue;
    }

    /// Pre-tax profit for the period
    pub(crate) fn close_income_statement(&mut self) -> f64 {
        let profit = self.flows.revenue - self.flows.wage_bill - self.flows.interest_paid;
        self.flows.profit = profit;
        profit
    }

    /// Corporate tax due on the period's profit
    pub(crate) fn tax_due(&self, rate: f64) -> f64 {
        self.flows.profit.max(0.0) * rate
    }

    /// Dividend out of after-tax profit, limited to positive cash
    pub(crate) fn dividend_due(&self, payout_ratio: f64) -> f64 {
        let after_tax = (self.flows.profit - self.flows.tax_paid).max(0.0);
        (after_tax * payout_ratio).min(self.cash.max(0.0))
    }

    /// Update the insolvency counter; returns true when the firm must exit
    pub(crate) fn assess_solvency(&mut self, threshold: u32) -> bool {
        if self.equity() < 0.0 {
            self.insolvency_counter += 1;
        } else {
            self.insolvency_counter = 0;
        }
        self.insolvency_counter >= threshold
    }

    pub(crate) fn mark_dead(&mut self, period: usize) {
        self.alive = false;
        self.died = Some(period);
        self.vacancies = 0;
        self.labour_demand = 0;
        self.production_plan = 0.0;
    }

    pub(crate) fn add_employee(&mut self, household: HouseholdId) {
        if let Err(pos) = self.employees.binary_search(&household) {
            self.employees.insert(pos, household);
        }
    }

    pub(crate) fn remove_employee(&mut self, household: HouseholdId) -> bool {
        match self.employees.binary_search(&household) {
            Ok(pos) => {
                self.employees.remove(pos);
                true
            }
            Err(_) => false,
        }
    }
}

impl Agent for Firm {
    type Context<'a> = FirmContext<'a>;
    type Effects = FirmPlan;

    /// Planning: expectations, markup, wage offer, price, output plan and
    /// labour demand, in that order.
    fn step(&mut self, ctx: &FirmContext<'_>, rng: &mut RngManager) -> FirmPlan {
        let firm_cfg = &ctx.config.firm;
        let market_cfg = &ctx.config.markets;

        let noise = firm_cfg.productivity_noise;
        self.shock = if noise > 0.0 {
            (noise * rng.standard_normal() - 0.5 * noise * noise).exp()
        } else {
            1.0
        };

        let previous_expectation = self.expected_demand;
        let excess_signal = if previous_expectation > 0.0 {
            (self.last_demand - previous_expectation) / previous_expectation
        } else {
            0.0
        };
        let smoothing = firm_cfg.expectation_smoothing;
        self.expected_demand =
            smoothing * previous_expectation + (1.0 - smoothing) * self.last_demand;

        self.markup = (self.markup + firm_cfg.markup_adjustment_speed * excess_signal)
            .clamp(firm_cfg.markup_min, firm_cfg.markup_max);

        if ctx.sector_wage > 0.0 {
            let stickiness = market_cfg.wage_stickiness;
            self.wage = stickiness * self.wage + (1.0 - stickiness) * ctx.sector_wage;
        }

        let target_price = self.unit_cost() * (1.0 + self.markup);
        self.price += market_cfg.price_adjustment_speed * (target_price - self.price);

        let inventory_gap =
            firm_cfg.inventory_target_ratio * self.expected_demand - self.inventory;
        let target_output = (self.expected_demand + inventory_gap).max(0.0);
        let plan = self.production_plan
            + market_cfg.quantity_adjustment_speed * (target_output - self.production_plan);
        self.production_plan = plan.max(0.0).min(self.capacity(ctx.config));

        let workers = self.production_plan * self.effective_labour_coefficient();
        self.labour_demand = (workers - 1e-9).ceil().max(0.0) as usize;
        let employed = self.employees.len();
        self.vacancies = self.labour_demand.saturating_sub(employed);

        FirmPlan {
            production_plan: self.production_plan,
            labour_demand: self.labour_demand,
            vacancies: self.vacancies,
            layoffs: employed.saturating_sub(self.labour_demand),
            price: self.price,
            wage_offer: self.wage,
        }
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::Firm(self.clone())
    }
}

//! One period, phase by phase
//!
//! A [`PeriodRun`] owns a working copy of the World and advances it
//! through the thirteen phases in fixed order. Nothing here touches the
//! committed state: the engine swaps the working copy in only when every
//! phase has succeeded.
//!
//! # Critical Invariants
//!
//! 1. **Fixed order**: phases run in [`Phase::ALL`] order, every period
//! 2. **Closed payments**: every money movement goes through the World's
//!    payment primitives, so sector net worth keeps summing to zero
//! 3. **Finite state**: after each phase prices, wages, balances and rates
//!    are checked; the first non-finite value aborts the period

use tracing::{debug, warn};

use super::engine::SimulationError;
use super::lifecycle;
use crate::config::ModelConfig;
use crate::core::phase::Phase;
use crate::markets::{CreditMarket, GoodsMarket, GoodsOffer, LabourMarket, Market};
use crate::models::agent::Agent;
use crate::models::bank::BankContext;
use crate::models::central_bank::CentralBankContext;
use crate::models::event::Event;
use crate::models::firm::FirmContext;
use crate::models::government::{Government, GovernmentContext};
use crate::models::household::HouseholdContext;
use crate::models::ids::{Account, BankId, FirmId, HouseholdId};
use crate::models::state::World;
use crate::parallel::Executor;
use crate::recorder::{MacroRecord, PeriodActivity};
use crate::rng::{RngManager, StreamKey};

/// Everything a successful period hands back to the engine
pub(crate) struct PeriodOutput {
    pub world: World,
    pub record: MacroRecord,
    pub events: Vec<Event>,
}

pub(crate) struct PeriodRun<'a> {
    config: &'a ModelConfig,
    executor: &'a Executor,
    period: usize,
    world: World,
    events: Vec<Event>,
    activity: PeriodActivity,
    opening_price_index: f64,
    inflation: f64,
    government_demand: f64,
}

impl<'a> PeriodRun<'a> {
    pub fn new(config: &'a ModelConfig, executor: &'a Executor, period: usize, world: World) -> Self {
        let opening_price_index = world.stats().price_index;
        Self {
            config,
            executor,
            period,
            world,
            events: Vec::new(),
            activity: PeriodActivity::default(),
            opening_price_index,
            inflation: 0.0,
            government_demand: 0.0,
        }
    }

    /// Run all thirteen phases and build the period's record
    pub fn execute(mut self) -> Result<PeriodOutput, SimulationError> {
        for phase in Phase::ALL {
            debug!(period = self.period, phase = phase.name(), "phase");
            self.run_phase(phase)?;
            self.world.refresh_bank_positions();
            check_finite(&self.world, self.period, phase)?;
        }

        let record = MacroRecord::capture(self.period, &self.world, self.inflation, self.activity);
        Ok(PeriodOutput {
            world: self.world,
            record,
            events: self.events,
        })
    }

    fn run_phase(&mut self, phase: Phase) -> Result<(), SimulationError> {
        match phase {
            Phase::ResetFlows => self.reset_flows(),
            Phase::PolicyRate => self.set_policy_rate(),
            Phase::LendingTerms => self.set_lending_terms(),
            Phase::CreditMarket => return self.clear_credit(),
            Phase::FirmPlanning => self.plan_firms(),
            Phase::LabourMarket => return self.clear_labour(),
            Phase::Production => self.produce_and_pay_wages(),
            Phase::HouseholdIncome => self.household_income(),
            Phase::GoodsMarket => return self.clear_goods(),
            Phase::Taxes => self.taxes_and_dividends(),
            Phase::GovernmentBudget => self.government_budget(),
            Phase::InflationUpdate => self.update_inflation(),
            Phase::ExitEntryRecord => self.exit_entry(),
        }
        Ok(())
    }

    fn system_rng(&self, phase: Phase) -> RngManager {
        RngManager::substream(self.config.simulation.seed, StreamKey::System, self.period, phase.tag())
    }

    fn starvation(&mut self, market: Market) -> Result<(), SimulationError> {
        if self.config.simulation.halt_on_market_starvation {
            return Err(SimulationError::MarketStarvation {
                period: self.period,
                market,
            });
        }
        warn!(period = self.period, %market, "market starvation");
        self.events.push(Event::MarketStarvation {
            period: self.period,
            market,
        });
        Ok(())
    }

    // ========================================================================
    // Phases 1-4: flows, policy, lending terms, credit
    // ========================================================================

    fn reset_flows(&mut self) {
        self.world.government_mut().reset_flows();
        for firm in self.world.firms_mut() {
            firm.begin_period();
        }
        for household in self.world.households_mut() {
            household.begin_period();
        }
        for bank in self.world.banks_mut() {
            bank.begin_period();
        }
    }

    fn set_policy_rate(&mut self) {
        let mut rng = self.system_rng(Phase::PolicyRate);
        let ctx = CentralBankContext {
            config: &self.config.central_bank,
        };
        let rate = self.world.central_bank_mut().step(&ctx, &mut rng);
        debug!(period = self.period, rate, "policy rate");
    }

    fn set_lending_terms(&mut self) {
        let ctx = BankContext {
            config: &self.config.bank,
            policy_rate: self.world.central_bank().policy_rate(),
        };
        let (seed, period, tag) = (self.config.simulation.seed, self.period, Phase::LendingTerms.tag());
        for bank in self.world.banks_mut() {
            let mut rng = RngManager::substream(seed, bank.id, period, tag);
            bank.step(&ctx, &mut rng);
        }
    }

    fn clear_credit(&mut self) -> Result<(), SimulationError> {
        let outcome = CreditMarket::new(self.config, self.period).clear(&mut self.world, &mut self.events);
        debug!(
            period = self.period,
            applications = outcome.applications,
            approvals = outcome.approvals,
            rejections = outcome.rejections,
            "credit market"
        );
        self.activity.new_lending = outcome.new_lending;
        self.activity.loan_rejections = outcome.rejections;
        if outcome.starved {
            self.starvation(Market::Credit)?;
        }
        Ok(())
    }

    // ========================================================================
    // Phases 5-7: planning, hiring, production and wages
    // ========================================================================

    fn plan_firms(&mut self) {
        let config = self.config;
        let (seed, period, tag) = (config.simulation.seed, self.period, Phase::FirmPlanning.tag());
        let sector_wages = self.world.stats().sector_wages.clone();

        let plans = self.executor.map_slice_mut(self.world.firms_mut(), |firm| {
            if !firm.alive {
                return None;
            }
            let ctx = FirmContext {
                config,
                sector_wage: sector_wages.get(firm.sector).copied().unwrap_or(0.0),
            };
            let mut rng = RngManager::substream(seed, firm.id, period, tag);
            Some(firm.step(&ctx, &mut rng))
        });
        let vacancies: usize = plans.iter().flatten().map(|p| p.vacancies).sum();
        debug!(period, vacancies, "firm plans");
    }

    fn clear_labour(&mut self) -> Result<(), SimulationError> {
        let outcome = LabourMarket::new(self.config, self.period).clear(&mut self.world, &mut self.events);
        debug!(
            period = self.period,
            separations = outcome.separations,
            layoffs = outcome.layoffs,
            matches = outcome.matches.len(),
            unmatched = outcome.unmatched.len(),
            "labour market"
        );
        if outcome.starved {
            self.starvation(Market::Labour)?;
        }
        Ok(())
    }

    fn produce_and_pay_wages(&mut self) {
        for id in self.world.live_firm_ids() {
            let Some(firm) = self.world.firm_mut(id) else { continue };
            firm.produce(self.config);
            let wage = firm.wage;
            let employees = firm.employees.clone();

            for &household in &employees {
                self.world.transfer(Account::Firm(id), Account::Household(household), wage);
                if let Some(h) = self.world.household_mut(household) {
                    h.wage = wage;
                    h.flows.wage_income += wage;
                }
            }
            if let Some(firm) = self.world.firm_mut(id) {
                firm.flows.wage_bill += wage * employees.len() as f64;
            }
        }
    }

    // ========================================================================
    // Phases 8-9: household income, goods market, debt service
    // ========================================================================

    fn household_income(&mut self) {
        let ppy = self.config.simulation.periods_per_year as f64;

        // Unemployment benefits at last period's average wage
        let benefit = Government::benefit_per_head(&self.config.government, self.world.stats().average_wage);
        if benefit > 0.0 {
            let unemployed: Vec<HouseholdId> = self
                .world
                .households()
                .iter()
                .filter(|h| h.employer.is_none())
                .map(|h| h.id)
                .collect();
            for &household in &unemployed {
                self.world.transfer(Account::Government, Account::Household(household), benefit);
                if let Some(h) = self.world.household_mut(household) {
                    h.flows.benefit_income += benefit;
                }
            }
            self.world.government_mut().flows.benefits += benefit * unemployed.len() as f64;
        }

        // Deposit interest on household balances
        let interest: Vec<(BankId, HouseholdId, f64)> = self
            .world
            .households()
            .iter()
            .filter(|h| h.wealth > 0.0)
            .filter_map(|h| {
                let rate = self.world.bank(h.house_bank)?.deposit_rate;
                let amount = h.wealth * rate / ppy;
                (amount > 0.0).then_some((h.house_bank, h.id, amount))
            })
            .collect();
        for (bank, household, amount) in interest {
            self.world.bank_pays(bank, Account::Household(household), amount);
            if let Some(b) = self.world.bank_mut(bank) {
                b.flows.deposit_interest += amount;
            }
            if let Some(h) = self.world.household_mut(household) {
                h.flows.interest_income += amount;
            }
        }

        // Consumption plans
        let ctx = HouseholdContext {
            income_tax_rate: self.config.government.income_tax_rate,
            wealth_draw_rate: self.config.household.wealth_draw_rate,
        };
        let (seed, period, tag) = (self.config.simulation.seed, self.period, Phase::HouseholdIncome.tag());
        let plans = self.executor.map_slice_mut(self.world.households_mut(), |household| {
            let mut rng = RngManager::substream(seed, household.id, period, tag);
            household.step(&ctx, &mut rng)
        });

        // Government demand against last period's GDP
        let gov_ctx = GovernmentContext {
            config: &self.config.government,
            trailing_gdp: self.world.stats().nominal_gdp,
        };
        let mut rng = self.system_rng(Phase::HouseholdIncome);
        self.government_demand = self.world.government_mut().step(&gov_ctx, &mut rng);

        debug!(
            period,
            household_demand = plans.iter().sum::<f64>(),
            government_demand = self.government_demand,
            "consumption plans"
        );
    }

    fn clear_goods(&mut self) -> Result<(), SimulationError> {
        let offers: Vec<GoodsOffer> = self
            .world
            .firms()
            .iter()
            .filter(|f| f.alive)
            .map(|f| GoodsOffer {
                firm: f.id,
                price: f.price,
                supply: f.inventory,
            })
            .collect();
        if offers.is_empty() {
            self.starvation(Market::Goods)?;
        }

        let household_demand: f64 = self
            .world
            .households()
            .iter()
            .map(|h| h.flows.planned_consumption)
            .sum();
        let outcome = GoodsMarket::clear(&offers, household_demand + self.government_demand);
        let fill = outcome.fill_ratio;

        // Buyers pay their plans scaled by the fill ratio; sellers receive
        // their revenue. Both sides sum to total sales.
        let mut payers: Vec<(Account, f64)> = self
            .world
            .households()
            .iter()
            .map(|h| (Account::Household(h.id), h.flows.planned_consumption * fill))
            .filter(|&(_, x)| x > 0.0)
            .collect();
        let government_spend = self.government_demand * fill;
        if government_spend > 0.0 {
            payers.push((Account::Government, government_spend));
        }
        let payees: Vec<(Account, f64)> = outcome
            .allocations
            .iter()
            .filter(|a| a.revenue > 0.0)
            .map(|a| (Account::Firm(a.firm), a.revenue))
            .collect();
        self.world.settle(&payers, &payees);

        for household in self.world.households_mut() {
            household.flows.consumption = household.flows.planned_consumption * fill;
        }
        self.world.government_mut().flows.purchases += government_spend;
        for allocation in &outcome.allocations {
            if let Some(firm) = self.world.firm_mut(allocation.firm) {
                firm.record_sales(allocation.demanded_units, allocation.sold_units);
            }
        }

        let previous = self.world.stats().price_index;
        let price_index = outcome
            .price_index()
            .or_else(|| self.world.mean_price())
            .unwrap_or(previous);
        let stats = self.world.stats_mut();
        stats.price_index = price_index;
        stats.nominal_gdp = outcome.sales;
        stats.real_gdp = outcome.units_sold;
        debug!(
            period = self.period,
            sales = outcome.sales,
            fill_ratio = fill,
            price_index,
            "goods market"
        );

        self.service_debt();
        for firm in self.world.firms_mut().iter_mut().filter(|f| f.alive) {
            firm.close_income_statement();
        }
        Ok(())
    }

    /// Scheduled interest and principal on every loan, then overdraft
    /// interest at the house bank's lending rate
    fn service_debt(&mut self) {
        let ppy = self.config.simulation.periods_per_year;
        let payments: Vec<(BankId, FirmId, f64, f64)> = self
            .world
            .banks()
            .iter()
            .flat_map(|b| {
                b.loan_book.values().map(move |loan| {
                    let (interest, principal) = loan.scheduled_payment(ppy);
                    (b.id, loan.borrower, interest, principal)
                })
            })
            .collect();

        for (bank, firm, interest, principal) in payments {
            self.world.bank_receives(bank, Account::Firm(firm), interest + principal);
            if let Some(b) = self.world.bank_mut(bank) {
                b.flows.interest_income += interest;
                b.apply_repayment(firm, principal);
            }
            if let Some(f) = self.world.firm_mut(firm) {
                f.debt = (f.debt - principal).max(0.0);
                f.flows.interest_paid += interest;
                f.flows.principal_paid += principal;
            }
        }

        let overdrafts: Vec<(BankId, FirmId, f64)> = self
            .world
            .firms()
            .iter()
            .filter(|f| f.alive && f.cash < 0.0)
            .filter_map(|f| {
                let rate = self.world.bank(f.house_bank)?.lending_rate;
                Some((f.house_bank, f.id, -f.cash * rate / ppy as f64))
            })
            .filter(|&(_, _, x)| x > 0.0)
            .collect();
        for (bank, firm, interest) in overdrafts {
            self.world.bank_receives(bank, Account::Firm(firm), interest);
            if let Some(b) = self.world.bank_mut(bank) {
                b.flows.interest_income += interest;
            }
            if let Some(f) = self.world.firm_mut(firm) {
                f.flows.interest_paid += interest;
            }
        }
    }

    // ========================================================================
    // Phases 10-12: taxes, budget, inflation
    // ========================================================================

    fn taxes_and_dividends(&mut self) {
        let income_tax_rate = self.config.government.income_tax_rate;
        let income_taxes: Vec<(HouseholdId, f64)> = self
            .world
            .households()
            .iter()
            .map(|h| (h.id, h.income_tax_due(income_tax_rate)))
            .filter(|&(_, t)| t > 0.0)
            .collect();
        for (household, tax) in income_taxes {
            self.world.transfer(Account::Household(household), Account::Government, tax);
            if let Some(h) = self.world.household_mut(household) {
                h.flows.tax_paid += tax;
            }
            self.world.government_mut().flows.income_tax += tax;
        }

        let corporate_tax_rate = self.config.government.corporate_tax_rate;
        let corporate_taxes: Vec<(FirmId, f64)> = self
            .world
            .firms()
            .iter()
            .filter(|f| f.alive)
            .map(|f| (f.id, f.tax_due(corporate_tax_rate)))
            .filter(|&(_, t)| t > 0.0)
            .collect();
        for (firm, tax) in corporate_taxes {
            self.world.transfer(Account::Firm(firm), Account::Government, tax);
            if let Some(f) = self.world.firm_mut(firm) {
                f.flows.tax_paid += tax;
            }
            self.world.government_mut().flows.corporate_tax += tax;
        }

        self.pay_dividends();
    }

    /// Firms distribute part of after-tax profit, shared equally among
    /// households
    fn pay_dividends(&mut self) {
        let household_count = self.world.households().len();
        if household_count == 0 {
            return;
        }
        let payout = self.config.firm.dividend_payout_ratio;
        let payers: Vec<(Account, f64)> = self
            .world
            .firms()
            .iter()
            .filter(|f| f.alive)
            .map(|f| (Account::Firm(f.id), f.dividend_due(payout)))
            .filter(|&(_, d)| d > 0.0)
            .collect();
        let total: f64 = payers.iter().map(|(_, d)| d).sum();
        if total <= 0.0 {
            return;
        }
        let share = total / household_count as f64;
        let payees: Vec<(Account, f64)> = self
            .world
            .households()
            .iter()
            .map(|h| (Account::Household(h.id), share))
            .collect();
        self.world.settle(&payers, &payees);

        for &(account, dividend) in &payers {
            if let Account::Firm(id) = account {
                if let Some(f) = self.world.firm_mut(id) {
                    f.flows.dividends_paid += dividend;
                }
            }
        }
        for household in self.world.households_mut() {
            household.flows.dividend_income += share;
        }
    }

    fn government_budget(&mut self) {
        let gdp = self.world.stats().nominal_gdp;
        let ppy = self.config.simulation.periods_per_year;
        let deficit = self
            .world
            .government_mut()
            .finalize(&self.config.government, gdp, ppy);
        self.world.central_bank_mut().absorb_deficit(deficit);
        debug!(period = self.period, deficit, "government budget");
    }

    fn update_inflation(&mut self) {
        let stats = self.world.stats();
        let (price_index, real_gdp) = (stats.price_index, stats.real_gdp);
        self.inflation = if self.opening_price_index > 0.0 {
            price_index / self.opening_price_index - 1.0
        } else {
            0.0
        };
        self.world.central_bank_mut().observe(
            &self.config.central_bank,
            self.inflation,
            real_gdp,
            self.config.simulation.periods_per_year,
        );
    }

    // ========================================================================
    // Phase 13: exit, bank close, entry, aggregates
    // ========================================================================

    fn exit_entry(&mut self) {
        self.activity.firm_bankruptcies =
            lifecycle::exit(&mut self.world, self.config, self.period, &mut self.events);
        self.world.refresh_bank_positions();

        for bank in self.world.banks_mut() {
            let close = bank.close_period(&self.config.bank);
            if close.shortfall {
                warn!(
                    period = self.period,
                    bank = %bank.id,
                    capital_ratio = close.capital_ratio,
                    "capital shortfall"
                );
                self.events.push(Event::CapitalShortfall {
                    period: self.period,
                    bank: bank.id,
                    capital_ratio: close.capital_ratio,
                });
            }
        }

        self.activity.firm_entries =
            lifecycle::enter(&mut self.world, self.config, self.period, &mut self.events);

        let sectors = self.config.population.sectors.len();
        let average_wage = self.world.mean_wage().unwrap_or(self.world.stats().average_wage);
        let unemployment_rate = self.world.unemployment_rate();
        let sector_wages = self.world.sector_wages(sectors);
        let stats = self.world.stats_mut();
        stats.average_wage = average_wage;
        stats.unemployment_rate = unemployment_rate;
        stats.sector_wages = sector_wages;
    }
}

// ============================================================================
// Numeric checks
// ============================================================================

fn unstable(period: usize, phase: Phase, entity: String, quantity: &'static str, value: f64) -> SimulationError {
    SimulationError::NumericInstability {
        period,
        phase,
        entity,
        quantity,
        value,
    }
}

/// First non-finite (or non-positive price) state variable, if any
pub(crate) fn check_finite(world: &World, period: usize, phase: Phase) -> Result<(), SimulationError> {
    for f in world.firms().iter().filter(|f| f.alive) {
        if !(f.price.is_finite() && f.price > 0.0) {
            return Err(unstable(period, phase, f.id.to_string(), "price", f.price));
        }
        if !(f.wage.is_finite() && f.wage >= 0.0) {
            return Err(unstable(period, phase, f.id.to_string(), "wage", f.wage));
        }
        for (quantity, value) in [
            ("cash", f.cash),
            ("debt", f.debt),
            ("inventory", f.inventory),
            ("expected_demand", f.expected_demand),
        ] {
            if !value.is_finite() {
                return Err(unstable(period, phase, f.id.to_string(), quantity, value));
            }
        }
    }
    for h in world.households() {
        for (quantity, value) in [("wealth", h.wealth), ("reservation_wage", h.reservation_wage)] {
            if !value.is_finite() {
                return Err(unstable(period, phase, h.id.to_string(), quantity, value));
            }
        }
    }
    for b in world.banks() {
        for (quantity, value) in [
            ("lending_rate", b.lending_rate),
            ("deposit_rate", b.deposit_rate),
            ("reserves", b.reserves),
        ] {
            if !value.is_finite() {
                return Err(unstable(period, phase, b.id.to_string(), quantity, value));
            }
        }
    }
    let rate = world.central_bank().policy_rate();
    if !rate.is_finite() {
        return Err(unstable(period, phase, "central_bank".to_string(), "policy_rate", rate));
    }
    let debt = world.government().debt();
    if !debt.is_finite() {
        return Err(unstable(period, phase, "government".to_string(), "debt", debt));
    }
    Ok(())
}

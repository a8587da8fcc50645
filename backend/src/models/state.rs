//! World: the single owner of every agent
//!
//! Agents live in dense arenas indexed by their ids. Cross-agent
//! relationships (employer, house bank, lender) are ids resolved here at
//! use time, so there are no reference cycles and the whole world can be
//! cloned, checkpointed or stepped in isolation from any other world.
//!
//! # Money
//!
//! Every household and firm holds one deposit account at its house bank;
//! the government banks at the central bank. All payments go through the
//! primitives below, which move the payer's and payee's balances and the
//! house banks' reserves together:
//!
//! - [`World::transfer`]: depositor to depositor
//! - [`World::bank_pays`] / [`World::bank_receives`]: a bank as
//!   counterparty (lending, interest, repayment)
//!
//! # Critical Invariants
//!
//! 1. **Net worth closes**: household, firm, bank, government and central
//!    bank financial net worth sum to zero
//! 2. **Employment symmetry**: `household.employer == Some(f)` iff `f`
//!    lists the household among its employees, and `f` is alive
//! 3. **Debt symmetry**: a firm's `debt` equals the principal outstanding
//!    in all loan books under its id

use serde::{Deserialize, Serialize};

use super::bank::Bank;
use super::central_bank::CentralBank;
use super::firm::Firm;
use super::government::Government;
use super::household::Household;
use super::ids::{Account, BankId, FirmId, HouseholdId};

/// Market aggregates observed at the last committed period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Sales-weighted average price
    pub price_index: f64,
    /// Mean wage of employed households
    pub average_wage: f64,
    pub nominal_gdp: f64,
    pub real_gdp: f64,
    pub unemployment_rate: f64,
    /// Mean wage by sector (0 where nobody is employed)
    pub sector_wages: Vec<f64>,
}

/// Financial net worth by sector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorBalances {
    pub households: f64,
    pub firms: f64,
    pub banks: f64,
    pub government: f64,
    pub central_bank: f64,
}

impl SectorBalances {
    pub fn total(&self) -> f64 {
        self.households + self.firms + self.banks + self.government + self.central_bank
    }

    /// Largest absolute sector position, used to scale residuals
    pub fn scale(&self) -> f64 {
        [
            self.households,
            self.firms,
            self.banks,
            self.government,
            self.central_bank,
        ]
        .iter()
        .fold(1.0f64, |acc, v| acc.max(v.abs()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    firms: Vec<Firm>,
    households: Vec<Household>,
    banks: Vec<Bank>,
    central_bank: CentralBank,
    government: Government,
    stats: MarketStats,
}

impl World {
    pub fn new(
        firms: Vec<Firm>,
        households: Vec<Household>,
        banks: Vec<Bank>,
        central_bank: CentralBank,
        government: Government,
        stats: MarketStats,
    ) -> Self {
        let mut world = Self {
            firms,
            households,
            banks,
            central_bank,
            government,
            stats,
        };
        world.refresh_bank_positions();
        world
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn firm(&self, id: FirmId) -> Option<&Firm> {
        self.firms.get(id.index())
    }

    pub fn firm_mut(&mut self, id: FirmId) -> Option<&mut Firm> {
        self.firms.get_mut(id.index())
    }

    pub fn household(&self, id: HouseholdId) -> Option<&Household> {
        self.households.get(id.index())
    }

    pub fn household_mut(&mut self, id: HouseholdId) -> Option<&mut Household> {
        self.households.get_mut(id.index())
    }

    pub fn bank(&self, id: BankId) -> Option<&Bank> {
        self.banks.get(id.index())
    }

    pub fn bank_mut(&mut self, id: BankId) -> Option<&mut Bank> {
        self.banks.get_mut(id.index())
    }

    pub fn firms(&self) -> &[Firm] {
        &self.firms
    }

    pub fn firms_mut(&mut self) -> &mut [Firm] {
        &mut self.firms
    }

    pub fn households(&self) -> &[Household] {
        &self.households
    }

    pub fn households_mut(&mut self) -> &mut [Household] {
        &mut self.households
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn banks_mut(&mut self) -> &mut [Bank] {
        &mut self.banks
    }

    pub fn central_bank(&self) -> &CentralBank {
        &self.central_bank
    }

    pub fn central_bank_mut(&mut self) -> &mut CentralBank {
        &mut self.central_bank
    }

    pub fn government(&self) -> &Government {
        &self.government
    }

    pub fn government_mut(&mut self) -> &mut Government {
        &mut self.government
    }

    pub fn stats(&self) -> &MarketStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut MarketStats {
        &mut self.stats
    }

    pub fn live_firm_ids(&self) -> Vec<FirmId> {
        self.firms.iter().filter(|f| f.alive).map(|f| f.id).collect()
    }

    pub fn live_firm_count(&self) -> usize {
        self.firms.iter().filter(|f| f.alive).count()
    }

    pub fn employed_count(&self) -> usize {
        self.households.iter().filter(|h| h.employer.is_some()).count()
    }

    pub fn unemployment_rate(&self) -> f64 {
        if self.households.is_empty() {
            return 0.0;
        }
        1.0 - self.employed_count() as f64 / self.households.len() as f64
    }

    /// Mean contract wage of employed households, if anyone is employed
    pub fn mean_wage(&self) -> Option<f64> {
        let (sum, n) = self
            .households
            .iter()
            .filter(|h| h.employer.is_some())
            .fold((0.0, 0usize), |(s, n), h| (s + h.wage, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Mean contract wage by employer sector (0 where nobody is employed)
    pub fn sector_wages(&self, sectors: usize) -> Vec<f64> {
        let mut sums = vec![(0.0, 0usize); sectors];
        for household in &self.households {
            let Some(employer) = household.employer else { continue };
            if let Some(slot) = self
                .firm(employer)
                .and_then(|f| sums.get_mut(f.sector))
            {
                slot.0 += household.wage;
                slot.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(sum, n)| if n > 0 { sum / n as f64 } else { 0.0 })
            .collect()
    }

    /// Unweighted mean posted price of live firms
    pub fn mean_price(&self) -> Option<f64> {
        let (sum, n) = self
            .firms
            .iter()
            .filter(|f| f.alive)
            .fold((0.0, 0usize), |(s, n), f| (s + f.price, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Positive deposit balances across the banking system
    pub fn money_stock(&self) -> f64 {
        self.banks.iter().map(|b| b.deposits).sum()
    }

    pub fn total_loans(&self) -> f64 {
        self.banks.iter().map(|b| b.loans()).sum()
    }

    pub(crate) fn push_firm(&mut self, firm: Firm) {
        self.firms.push(firm);
    }

    // ========================================================================
    // Payments
    // ========================================================================

    fn credit(&mut self, account: Account, amount: f64) {
        match account {
            Account::Household(id) => {
                let household = &mut self.households[id.index()];
                household.wealth += amount;
                self.banks[household.house_bank.index()].reserves += amount;
            }
            Account::Firm(id) => {
                let firm = &mut self.firms[id.index()];
                firm.cash += amount;
                self.banks[firm.house_bank.index()].reserves += amount;
            }
            Account::Government => self.government.cash += amount,
        }
    }

    /// Move money between two depositors
    pub fn transfer(&mut self, from: Account, to: Account, amount: f64) {
        self.credit(from, -amount);
        self.credit(to, amount);
    }

    /// A bank pays a depositor out of its own resources
    pub fn bank_pays(&mut self, bank: BankId, to: Account, amount: f64) {
        self.banks[bank.index()].reserves -= amount;
        self.credit(to, amount);
    }

    /// A depositor pays a bank
    pub fn bank_receives(&mut self, bank: BankId, from: Account, amount: f64) {
        self.credit(from, -amount);
        self.banks[bank.index()].reserves += amount;
    }

    /// Settle one market round: every payer is debited and every payee
    /// credited in full. Both sides must sum to the same amount.
    pub(crate) fn settle(&mut self, payers: &[(Account, f64)], payees: &[(Account, f64)]) {
        debug_assert!({
            let paid: f64 = payers.iter().map(|(_, x)| x).sum();
            let received: f64 = payees.iter().map(|(_, x)| x).sum();
            (paid - received).abs() <= 1e-9 * paid.abs().max(1.0)
        });
        for &(account, amount) in payers {
            self.credit(account, -amount);
        }
        for &(account, amount) in payees {
            self.credit(account, amount);
        }
    }

    /// Forgive a firm's overdraft at its house bank; returns the loss
    pub(crate) fn write_off_overdraft(&mut self, firm: FirmId) -> f64 {
        let f = &mut self.firms[firm.index()];
        if f.cash >= 0.0 {
            return 0.0;
        }
        let loss = -f.cash;
        f.cash = 0.0;
        let bank = &mut self.banks[f.house_bank.index()];
        bank.flows.write_offs += loss;
        loss
    }

    /// Recompute each bank's deposit and overdraft aggregates
    pub fn refresh_bank_positions(&mut self) {
        for bank in &mut self.banks {
            bank.deposits = 0.0;
            bank.overdrafts = 0.0;
        }
        for household in &self.households {
            let bank = &mut self.banks[household.house_bank.index()];
            if household.wealth >= 0.0 {
                bank.deposits += household.wealth;
            } else {
                bank.overdrafts -= household.wealth;
            }
        }
        for firm in &self.firms {
            let bank = &mut self.banks[firm.house_bank.index()];
            if firm.cash >= 0.0 {
                bank.deposits += firm.cash;
            } else {
                bank.overdrafts -= firm.cash;
            }
        }
    }

    // ========================================================================
    // Employment
    // ========================================================================

    pub(crate) fn hire(&mut self, firm: FirmId, household: HouseholdId, wage: f64) {
        self.firms[firm.index()].add_employee(household);
        self.households[household.index()].take_job(firm, wage);
    }

    /// End a household's employment; returns the former employer
    pub(crate) fn release(&mut self, household: HouseholdId) -> Option<FirmId> {
        let employer = self.households[household.index()].employer?;
        self.firms[employer.index()].remove_employee(household);
        self.households[household.index()].lose_job();
        Some(employer)
    }

    /// Check employment symmetry (invariant 2)
    pub fn employment_consistent(&self) -> bool {
        let households_ok = self.households.iter().all(|h| match h.employer {
            Some(f) => self
                .firm(f)
                .map_or(false, |firm| firm.alive && firm.employees.binary_search(&h.id).is_ok()),
            None => true,
        });
        let firms_ok = self.firms.iter().all(|f| {
            f.employees.iter().all(|&h| {
                self.household(h).map_or(false, |hh| hh.employer == Some(f.id))
            })
        });
        households_ok && firms_ok
    }

    /// Principal outstanding against a firm across all banks
    pub fn debt_of(&self, firm: FirmId) -> f64 {
        self.banks
            .iter()
            .filter_map(|b| b.loan_to(firm))
            .map(|l| l.principal)
            .sum()
    }

    // ========================================================================
    // Accounting
    // ========================================================================

    /// Financial net worth by sector (real assets excluded)
    pub fn sector_balances(&self) -> SectorBalances {
        let households = self.households.iter().map(|h| h.wealth).sum();
        let firms = self.firms.iter().map(|f| f.cash - f.debt).sum();
        let banks = self.banks.iter().map(|b| b.equity()).sum();
        let government = self.government.cash - self.government.debt;
        let reserves: f64 = self.banks.iter().map(|b| b.reserves).sum();
        let central_bank = self.central_bank.bonds - reserves - self.government.cash;
        SectorBalances {
            households,
            firms,
            banks,
            government,
            central_bank,
        }
    }
}

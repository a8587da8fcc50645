//! Bank agent and loan records
//!
//! A bank's balance sheet is reserves and loans against its depositors'
//! net balances. Deposits and overdrafts are aggregates over the
//! depositors whose house bank it is; the World refreshes them after
//! payments move.
//!
//! # Critical Invariants
//!
//! 1. `equity = reserves + loans + overdrafts - deposits`
//! 2. A loan is owned by exactly one bank and is removed on full
//!    repayment or default
//! 3. Equity changes only through interest income, deposit interest and
//!    write-offs (period net income)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::agent::{Agent, AgentSnapshot};
use super::ids::{BankId, FirmId};
use crate::config::BankConfig;
use crate::rng::RngManager;

/// Externally supplied initial attributes of one bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSample {
    /// Opening equity; reserves are derived so the balance sheet closes
    pub equity: f64,
}

/// Outstanding loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub borrower: FirmId,
    pub principal: f64,
    /// Annual rate
    pub rate: f64,
    pub origination_period: usize,
    /// Scheduled principal repayment per period
    pub installment: f64,
}

impl Loan {
    /// Interest and principal due this period
    pub fn scheduled_payment(&self, periods_per_year: usize) -> (f64, f64) {
        let interest = self.principal * self.rate / periods_per_year as f64;
        let mut principal = self.installment.min(self.principal);
        // Settle dust with the final installment so nothing is dropped unpaid
        if self.principal - principal <= LOAN_DUST {
            principal = self.principal;
        }
        (interest, principal)
    }
}

/// Principal below this is treated as repaid
const LOAN_DUST: f64 = 1e-9;

/// Why an application was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Risk appetite is zero after a capital shortfall
    NoRiskAppetite,
    DebtServiceCoverage,
    Collateral,
}

/// Data a bank needs to screen one application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditApplication {
    pub firm: FirmId,
    pub amount: f64,
    pub last_revenue: f64,
    pub existing_debt: f64,
    /// Capital plus inventory at cost
    pub real_assets: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankFlows {
    pub interest_income: f64,
    pub deposit_interest: f64,
    pub write_offs: f64,
    pub new_lending: f64,
    pub principal_repaid: f64,
    pub approvals: usize,
    pub rejections: usize,
}

impl BankFlows {
    pub fn net_income(&self) -> f64 {
        self.interest_income - self.deposit_interest - self.write_offs
    }
}

/// Lending terms posted in phase 3
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LendingTerms {
    pub lending_rate: f64,
    pub deposit_rate: f64,
    pub risk_appetite: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BankContext<'a> {
    pub config: &'a BankConfig,
    pub policy_rate: f64,
}

/// Income statement summary produced at period close
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankClose {
    pub net_income: f64,
    pub capital_ratio: f64,
    pub shortfall: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub(crate) id: BankId,
    pub(crate) reserves: f64,
    pub(crate) deposits: f64,
    pub(crate) overdrafts: f64,
    pub(crate) loan_book: BTreeMap<FirmId, Loan>,
    pub(crate) risk_appetite: f64,
    pub(crate) lending_rate: f64,
    pub(crate) deposit_rate: f64,
    /// Write-offs over the loan book, from the last closed period
    pub(crate) npl_ratio: f64,
    pub(crate) loans_at_open: f64,
    pub(crate) equity_at_open: f64,
    pub(crate) flows: BankFlows,
}

impl Bank {
    pub fn new(id: BankId) -> Self {
        Self {
            id,
            reserves: 0.0,
            deposits: 0.0,
            overdrafts: 0.0,
            loan_book: BTreeMap::new(),
            risk_appetite: 1.0,
            lending_rate: 0.0,
            deposit_rate: 0.0,
            npl_ratio: 0.0,
            loans_at_open: 0.0,
            equity_at_open: 0.0,
            flows: BankFlows::default(),
        }
    }

    pub fn id(&self) -> BankId {
        self.id
    }

    pub fn reserves(&self) -> f64 {
        self.reserves
    }

    /// Positive balances of depositors (a liability)
    pub fn deposits(&self) -> f64 {
        self.deposits
    }

    /// Negative balances of depositors (an asset)
    pub fn overdrafts(&self) -> f64 {
        self.overdrafts
    }

    pub fn loan_book(&self) -> &BTreeMap<FirmId, Loan> {
        &self.loan_book
    }

    pub fn loan_to(&self, firm: FirmId) -> Option<&Loan> {
        self.loan_book.get(&firm)
    }

    pub fn loans(&self) -> f64 {
        self.loan_book.values().map(|l| l.principal).sum()
    }

    pub fn equity(&self) -> f64 {
        self.reserves + self.loans() + self.overdrafts - self.deposits
    }

    pub fn risk_appetite(&self) -> f64 {
        self.risk_appetite
    }

    pub fn lending_rate(&self) -> f64 {
        self.lending_rate
    }

    pub fn deposit_rate(&self) -> f64 {
        self.deposit_rate
    }

    pub fn npl_ratio(&self) -> f64 {
        self.npl_ratio
    }

    pub fn flows(&self) -> &BankFlows {
        &self.flows
    }

    /// Equity at the start of the current period
    pub fn equity_at_open(&self) -> f64 {
        self.equity_at_open
    }

    /// Equity over risk-weighted assets
    pub fn capital_ratio(&self, risk_weight: f64) -> f64 {
        let risk_weighted = risk_weight * (self.loans() + self.overdrafts);
        if risk_weighted > 0.0 {
            self.equity() / risk_weighted
        } else {
            f64::MAX
        }
    }

    pub(crate) fn begin_period(&mut self) {
        self.flows = BankFlows::default();
        self.loans_at_open = self.loans();
        self.equity_at_open = self.equity();
    }

    /// Hard screening: both ratios must clear their thresholds, which
    /// tighten as risk appetite falls.
    pub fn screen(
        &self,
        application: &CreditApplication,
        config: &BankConfig,
        periods_per_year: usize,
    ) -> Result<(), RejectionReason> {
        if self.risk_appetite <= 0.0 {
            return Err(RejectionReason::NoRiskAppetite);
        }
        let amount = application.amount;
        let service_rate =
            self.lending_rate / periods_per_year as f64 + 1.0 / config.loan_maturity as f64;
        let debt_service = service_rate * (application.existing_debt + amount);
        let coverage = if debt_service > 0.0 {
            application.last_revenue / debt_service
        } else {
            f64::MAX
        };
        if coverage < config.lending_threshold / self.risk_appetite {
            return Err(RejectionReason::DebtServiceCoverage);
        }

        let collateral =
            (application.real_assets - application.existing_debt).max(0.0) / amount;
        if collateral < config.collateral_threshold / self.risk_appetite {
            return Err(RejectionReason::Collateral);
        }
        Ok(())
    }

    /// Book a new loan (or top up an existing one) in the loan book.
    /// Money moves separately through the World.
    pub(crate) fn originate(
        &mut self,
        firm: FirmId,
        amount: f64,
        period: usize,
        maturity: usize,
    ) {
        let rate = self.lending_rate;
        let loan = self.loan_book.entry(firm).or_insert(Loan {
            borrower: firm,
            principal: 0.0,
            rate,
            origination_period: period,
            installment: 0.0,
        });
        let total = loan.principal + amount;
        loan.rate = (loan.rate * loan.principal + rate * amount) / total;
        loan.principal = total;
        loan.origination_period = period;
        loan.installment = total / maturity as f64;
        self.flows.new_lending += amount;
        self.flows.approvals += 1;
    }

    /// Reduce principal after a repayment; drops the loan once repaid
    pub(crate) fn apply_repayment(&mut self, firm: FirmId, principal: f64) {
        if let Some(loan) = self.loan_book.get_mut(&firm) {
            loan.principal -= principal;
            if loan.principal <= LOAN_DUST {
                self.loan_book.remove(&firm);
            }
        }
        self.flows.principal_repaid += principal;
    }

    /// Remove a defaulted loan; returns the outstanding principal
    pub(crate) fn remove_loan(&mut self, firm: FirmId) -> f64 {
        self.loan_book.remove(&firm).map_or(0.0, |l| l.principal)
    }

    /// Close the income statement and update risk appetite for next period
    pub(crate) fn close_period(&mut self, config: &BankConfig) -> BankClose {
        let net_income = self.flows.net_income();
        self.npl_ratio = if self.loans_at_open > 0.0 {
            self.flows.write_offs / self.loans_at_open
        } else {
            0.0
        };

        let capital_ratio = self.capital_ratio(config.risk_weight);
        let shortfall = capital_ratio < config.capital_requirement;
        if shortfall {
            self.risk_appetite *= config.risk_appetite_cut;
        } else {
            self.risk_appetite += config.risk_appetite_recovery * (1.0 - self.risk_appetite);
        }
        self.risk_appetite = self.risk_appetite.clamp(0.0, 1.0);

        BankClose {
            net_income,
            capital_ratio,
            shortfall,
        }
    }
}

impl Agent for Bank {
    type Context<'a> = BankContext<'a>;
    type Effects = LendingTerms;

    /// Lending rate = policy rate + markup + sensitivity * NPL ratio
    fn step(&mut self, ctx: &BankContext<'_>, _rng: &mut RngManager) -> LendingTerms {
        let config = ctx.config;
        self.lending_rate = ctx.policy_rate
            + config.base_interest_markup
            + config.risk_premium_sensitivity * self.npl_ratio;
        self.deposit_rate = (ctx.policy_rate - config.deposit_spread).max(0.0);
        LendingTerms {
            lending_rate: self.lending_rate,
            deposit_rate: self.deposit_rate,
            risk_appetite: self.risk_appetite,
        }
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::Bank(self.clone())
    }
}

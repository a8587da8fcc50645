//! Credit market
//!
//! Firms whose cash will not cover the period's wage bill and scheduled
//! debt service apply for the shortfall. An application goes first to the
//! bank `firm_id % bank_count`; with rationing disabled a rejected
//! application is passed on to the following banks in turn. Screening is
//! hard: an application is granted in full or not at all.
//!
//! Every rejection is recorded, both as an event and in the rejecting
//! bank's flow counters. A rejection is an outcome, not an error.

use crate::config::ModelConfig;
use crate::models::bank::CreditApplication;
use crate::models::event::Event;
use crate::models::ids::{Account, BankId, FirmId};
use crate::models::state::World;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditOutcome {
    pub applications: usize,
    pub approvals: usize,
    pub rejections: usize,
    pub new_lending: f64,
    /// Applications were made but no bank has any risk appetite
    pub starved: bool,
}

pub struct CreditMarket<'a> {
    config: &'a ModelConfig,
    period: usize,
}

impl<'a> CreditMarket<'a> {
    pub fn new(config: &'a ModelConfig, period: usize) -> Self {
        Self { config, period }
    }

    /// Interest plus principal a firm is scheduled to pay this period
    pub fn scheduled_debt_service(world: &World, firm: FirmId, periods_per_year: usize) -> f64 {
        world
            .banks()
            .iter()
            .filter_map(|b| b.loan_to(firm))
            .map(|loan| {
                let (interest, principal) = loan.scheduled_payment(periods_per_year);
                interest + principal
            })
            .sum()
    }

    /// Working-capital applications from live firms, in ascending firm id
    pub fn applications(&self, world: &World) -> Vec<CreditApplication> {
        let ppy = self.config.simulation.periods_per_year;
        world
            .firms()
            .iter()
            .filter(|f| f.alive)
            .filter_map(|f| {
                let need = f.wage_bill() + Self::scheduled_debt_service(world, f.id, ppy) - f.cash;
                (need > 0.0).then(|| CreditApplication {
                    firm: f.id,
                    amount: need,
                    last_revenue: f.last_revenue,
                    existing_debt: f.debt,
                    real_assets: f.capital + f.inventory_value(),
                })
            })
            .collect()
    }

    pub fn clear(&self, world: &mut World, events: &mut Vec<Event>) -> CreditOutcome {
        let applications = self.applications(world);
        let bank_count = world.banks().len();
        let mut outcome = CreditOutcome {
            applications: applications.len(),
            starved: !applications.is_empty()
                && world.banks().iter().all(|b| b.risk_appetite <= 0.0),
            ..CreditOutcome::default()
        };
        if bank_count == 0 {
            return outcome;
        }

        let bank_config = &self.config.bank;
        let ppy = self.config.simulation.periods_per_year;
        let attempts = if self.config.markets.credit_rationing {
            1
        } else {
            bank_count
        };

        for mut application in applications {
            // Debt may have moved if an earlier application from the same
            // firm was granted; keep screening on the current book
            application.existing_debt = world.firm(application.firm).map_or(0.0, |f| f.debt);
            let first = application.firm.index() % bank_count;

            for k in 0..attempts {
                let bank_id = BankId((first + k) % bank_count);
                let bank = &mut world.banks_mut()[bank_id.index()];
                match bank.screen(&application, bank_config, ppy) {
                    Ok(()) => {
                        let rate = bank.lending_rate;
                        bank.originate(
                            application.firm,
                            application.amount,
                            self.period,
                            bank_config.loan_maturity,
                        );
                        world.bank_pays(bank_id, Account::Firm(application.firm), application.amount);
                        if let Some(firm) = world.firm_mut(application.firm) {
                            firm.debt += application.amount;
                            firm.flows.borrowed += application.amount;
                        }
                        events.push(Event::LoanApproved {
                            period: self.period,
                            bank: bank_id,
                            firm: application.firm,
                            amount: application.amount,
                            rate,
                        });
                        outcome.approvals += 1;
                        outcome.new_lending += application.amount;
                        break;
                    }
                    Err(reason) => {
                        bank.flows.rejections += 1;
                        events.push(Event::LoanRejected {
                            period: self.period,
                            bank: bank_id,
                            firm: application.firm,
                            amount: application.amount,
                            reason,
                        });
                        outcome.rejections += 1;
                    }
                }
            }
        }
        outcome
    }
}

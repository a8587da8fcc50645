//! Government: taxes, benefits, purchases and a proportional fiscal rule
//!
//! The government banks at the central bank. At period close the deficit
//! is financed by bond sales to the central bank, which returns the
//! government account to its opening balance.
//!
//! # Critical Invariants
//!
//! 1. `debt_t = debt_{t-1} + deficit_t`
//! 2. Central-bank bond holdings equal government debt

use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentSnapshot};
use crate::config::GovernmentConfig;
use crate::rng::RngManager;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernmentFlows {
    pub income_tax: f64,
    pub corporate_tax: f64,
    pub benefits: f64,
    pub purchases: f64,
}

impl GovernmentFlows {
    pub fn revenue(&self) -> f64 {
        self.income_tax + self.corporate_tax
    }

    pub fn spending(&self) -> f64 {
        self.benefits + self.purchases
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GovernmentContext<'a> {
    pub config: &'a GovernmentConfig,
    /// Nominal GDP of the last committed period
    pub trailing_gdp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Government {
    pub(crate) debt: f64,
    /// Balance at the central bank
    pub(crate) cash: f64,
    /// Scales purchases; set by the fiscal rule
    pub(crate) spending_multiplier: f64,
    pub(crate) deficit: f64,
    pub(crate) flows: GovernmentFlows,
}

impl Government {
    pub fn new(initial_debt: f64) -> Self {
        Self {
            debt: initial_debt,
            cash: 0.0,
            spending_multiplier: 1.0,
            deficit: 0.0,
            flows: GovernmentFlows::default(),
        }
    }

    pub fn debt(&self) -> f64 {
        self.debt
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn spending_multiplier(&self) -> f64 {
        self.spending_multiplier
    }

    /// Deficit of the last finalised period
    pub fn deficit(&self) -> f64 {
        self.deficit
    }

    pub fn flows(&self) -> &GovernmentFlows {
        &self.flows
    }

    /// Phase 1: reset period flow counters
    pub(crate) fn reset_flows(&mut self) {
        self.flows = GovernmentFlows::default();
        self.deficit = 0.0;
    }

    /// Benefit paid to each unemployed household
    pub fn benefit_per_head(config: &GovernmentConfig, average_wage: f64) -> f64 {
        config.unemployment_benefit_ratio * average_wage
    }

    /// Phase 11: book the deficit, issue bonds, apply the fiscal rule.
    /// Returns the deficit.
    pub(crate) fn finalize(
        &mut self,
        config: &GovernmentConfig,
        gdp: f64,
        periods_per_year: usize,
    ) -> f64 {
        let deficit = self.flows.spending() - self.flows.revenue();
        self.deficit = deficit;
        self.debt += deficit;
        self.cash += deficit;

        let annual_gdp = gdp * periods_per_year as f64;
        if config.active && annual_gdp > 0.0 {
            let excess = self.debt / annual_gdp - config.debt_gdp_target;
            self.spending_multiplier = if excess > 0.0 {
                (1.0 - config.adjustment_speed * excess).clamp(0.0, 1.0)
            } else {
                1.0
            };
        }
        deficit
    }
}

impl Agent for Government {
    type Context<'a> = GovernmentContext<'a>;
    type Effects = f64;

    /// Goods demand for the period
    fn step(&mut self, ctx: &GovernmentContext<'_>, _rng: &mut RngManager) -> f64 {
        (ctx.config.spending_gdp_ratio * ctx.trailing_gdp * self.spending_multiplier).max(0.0)
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::Government(self.clone())
    }
}

//! Central bank: smoothed Taylor rule and deficit monetisation
//!
//! The rule reacts to the previous period's observed inflation and output
//! gap. In period 1 nothing has been observed yet, so inflation is taken to
//! be at target and the gap to be zero.

use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentSnapshot};
use crate::config::CentralBankConfig;
use crate::rng::RngManager;

#[derive(Debug, Clone, Copy)]
pub struct CentralBankContext<'a> {
    pub config: &'a CentralBankConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralBank {
    pub(crate) policy_rate: f64,
    /// Government bonds held (equal to government debt)
    pub(crate) bonds: f64,
    /// Last observed inflation, annualised
    pub(crate) observed_inflation: f64,
    pub(crate) observed_output_gap: f64,
    /// Smoothed real output
    pub(crate) potential_output: f64,
}

impl CentralBank {
    pub fn new(config: &CentralBankConfig, initial_bonds: f64, initial_real_output: f64) -> Self {
        Self {
            policy_rate: (config.neutral_rate + config.inflation_target).max(config.lower_bound),
            bonds: initial_bonds,
            observed_inflation: config.inflation_target,
            observed_output_gap: 0.0,
            potential_output: initial_real_output,
        }
    }

    pub fn policy_rate(&self) -> f64 {
        self.policy_rate
    }

    pub fn bonds(&self) -> f64 {
        self.bonds
    }

    pub fn observed_inflation(&self) -> f64 {
        self.observed_inflation
    }

    pub fn observed_output_gap(&self) -> f64 {
        self.observed_output_gap
    }

    pub fn potential_output(&self) -> f64 {
        self.potential_output
    }

    /// Overwrite the observed inflation that the next rate decision uses
    pub fn set_observed_inflation(&mut self, annual_inflation: f64) {
        self.observed_inflation = annual_inflation;
    }

    /// Unsmoothed rule rate for the given observations
    pub fn rule_rate(config: &CentralBankConfig, inflation: f64, output_gap: f64) -> f64 {
        config.neutral_rate
            + inflation
            + config.inflation_coefficient * (inflation - config.inflation_target)
            + config.output_gap_coefficient * output_gap
    }

    /// Record the realised period for next period's decision
    ///
    /// `period_inflation` is per period; it is annualised by compounding.
    /// Returns the output gap.
    pub(crate) fn observe(
        &mut self,
        config: &CentralBankConfig,
        period_inflation: f64,
        real_output: f64,
        periods_per_year: usize,
    ) -> f64 {
        let base = 1.0 + period_inflation;
        self.observed_inflation = if base > 0.0 {
            base.powi(periods_per_year as i32) - 1.0
        } else {
            -1.0
        };
        let gap = if self.potential_output > 0.0 {
            (real_output - self.potential_output) / self.potential_output
        } else {
            0.0
        };
        self.observed_output_gap = gap;
        let s = config.potential_output_smoothing;
        self.potential_output = s * self.potential_output + (1.0 - s) * real_output;
        gap
    }

    /// Buy newly issued bonds (negative for a surplus)
    pub(crate) fn absorb_deficit(&mut self, deficit: f64) {
        self.bonds += deficit;
    }
}

impl Agent for CentralBank {
    type Context<'a> = CentralBankContext<'a>;
    type Effects = f64;

    fn step(&mut self, ctx: &CentralBankContext<'_>, _rng: &mut RngManager) -> f64 {
        let config = ctx.config;
        if config.active {
            let target =
                Self::rule_rate(config, self.observed_inflation, self.observed_output_gap);
            let smoothed = config.smoothing * self.policy_rate + (1.0 - config.smoothing) * target;
            self.policy_rate = smoothed.max(config.lower_bound);
        }
        self.policy_rate
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::CentralBank(self.clone())
    }
}

//! Model configuration
//!
//! A [`ModelConfig`] is the complete, validated parameter bundle for one run.
//! It is loaded from JSON, every section falls back to documented defaults,
//! and any key the engine does not recognise is rejected at load time so a
//! misspelt parameter can never silently run with its default.
//!
//! # Example
//!
//! ```rust
//! use macro_abm_core_rs::ModelConfig;
//!
//! let config = ModelConfig::from_json_str(
//!     r#"{ "simulation": { "periods": 8, "seed": 7 }, "population": { "firms": 5 } }"#,
//! ).unwrap();
//! assert_eq!(config.simulation.periods, 8);
//! assert_eq!(config.population.households, 500);
//!
//! let err = ModelConfig::from_json_str(r#"{ "firm": { "markupp": 0.2 } }"#);
//! assert!(err.is_err());
//! ```

mod validate;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration errors, raised before any period executes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Malformed document, wrong type, or unrecognised key
    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("configuration value {field} = {value} out of range: {reason}")]
    OutOfRange {
        field: String,
        value: f64,
        reason: String,
    },

    #[error("sector {0} is not one of the configured sectors")]
    UnknownSector(String),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub periods: usize,
    pub seed: u64,
    /// Leading periods excluded from evaluation statistics
    pub warm_up_periods: usize,
    pub periods_per_year: usize,
    /// Treat market starvation as fatal instead of a warning
    pub halt_on_market_starvation: bool,
    /// Worker threads for parallel agent phases (0 = library default)
    pub parallel_workers: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            periods: 40,
            seed: 42,
            warm_up_periods: 0,
            periods_per_year: 4,
            halt_on_market_starvation: false,
            parallel_workers: 0,
        }
    }
}

/// Shape of the synthetic initial population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    pub firms: usize,
    pub households: usize,
    pub banks: usize,
    pub regions: usize,
    pub sectors: Vec<String>,
    /// Mean wage per period
    pub wage_mean: f64,
    /// Mean output per worker per period
    pub productivity_mean: f64,
    pub initial_unemployment_rate: f64,
    /// Pareto shape of household wealth
    pub wealth_shape: f64,
    /// Initial debt as a fraction of firm capital
    pub firm_leverage: f64,
    /// Initial bank equity as a fraction of its loan book plus reserves
    pub bank_capital_ratio: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            firms: 100,
            households: 500,
            banks: 10,
            regions: 1,
            sectors: default_sectors(),
            wage_mean: 8_750.0,
            productivity_mean: 10.0,
            initial_unemployment_rate: 0.05,
            wealth_shape: 1.5,
            firm_leverage: 0.3,
            bank_capital_ratio: 0.15,
        }
    }
}

fn default_sectors() -> Vec<String> {
    [
        "agriculture",
        "mining",
        "manufacturing",
        "utilities",
        "construction",
        "wholesale_retail",
        "transport",
        "hospitality",
        "information_communication",
        "finance",
        "real_estate",
        "professional_services",
        "other_services",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirmConfig {
    pub initial_markup: f64,
    pub markup_min: f64,
    pub markup_max: f64,
    pub markup_adjustment_speed: f64,
    pub inventory_target_ratio: f64,
    /// Weight on the previous expectation in the demand EMA
    pub expectation_smoothing: f64,
    /// Std dev of the multiplicative productivity shock
    pub productivity_noise: f64,
    /// Units of output per currency unit of capital per period
    pub capacity_per_capital: f64,
    /// Workers per unit of output, by sector name
    pub sector_labour_coefficients: BTreeMap<String, f64>,
    pub dividend_payout_ratio: f64,
    pub entry_rate: f64,
    /// Entrant capital and demand relative to the template incumbent
    pub entrant_size_ratio: f64,
    /// Consecutive negative-equity periods before exit
    pub insolvency_threshold: u32,
    /// Initial equity may fall to -tolerance * capital before the
    /// population is rejected
    pub initial_equity_tolerance: f64,
}

impl Default for FirmConfig {
    fn default() -> Self {
        Self {
            initial_markup: 0.15,
            markup_min: 0.01,
            markup_max: 1.0,
            markup_adjustment_speed: 0.1,
            inventory_target_ratio: 0.2,
            expectation_smoothing: 0.5,
            productivity_noise: 0.02,
            capacity_per_capital: 0.001,
            sector_labour_coefficients: BTreeMap::new(),
            dividend_payout_ratio: 0.9,
            entry_rate: 0.02,
            entrant_size_ratio: 0.5,
            insolvency_threshold: 3,
            initial_equity_tolerance: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HouseholdConfig {
    pub mpc_mean: f64,
    pub mpc_std: f64,
    /// Fraction of existing wealth spent each period
    pub wealth_draw_rate: f64,
    /// Initial reservation wage relative to the mean wage
    pub reservation_wage_ratio: f64,
    /// Proportional reservation-wage cut after a failed search
    pub reservation_wage_decay: f64,
    /// Reservation wage never falls below this fraction of the average wage
    pub reservation_wage_floor: f64,
    pub job_search_sample_size: usize,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            mpc_mean: 0.8,
            mpc_std: 0.1,
            wealth_draw_rate: 0.036,
            reservation_wage_ratio: 0.9,
            reservation_wage_decay: 0.05,
            reservation_wage_floor: 0.4,
            job_search_sample_size: 5,
        }
    }
}

/// Bank behaviour; rates are annual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BankConfig {
    pub capital_requirement: f64,
    pub risk_weight: f64,
    pub base_interest_markup: f64,
    pub risk_premium_sensitivity: f64,
    /// Minimum debt-service coverage at full risk appetite
    pub lending_threshold: f64,
    /// Minimum collateral-to-loan ratio at full risk appetite
    pub collateral_threshold: f64,
    /// Deposit rate = policy rate - spread (floored at zero)
    pub deposit_spread: f64,
    /// Loan maturity in periods
    pub loan_maturity: usize,
    pub risk_appetite_cut: f64,
    pub risk_appetite_recovery: f64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            capital_requirement: 0.10,
            risk_weight: 1.0,
            base_interest_markup: 0.02,
            risk_premium_sensitivity: 0.05,
            lending_threshold: 1.2,
            collateral_threshold: 0.5,
            deposit_spread: 0.01,
            loan_maturity: 20,
            risk_appetite_cut: 0.5,
            risk_appetite_recovery: 0.25,
        }
    }
}

/// Taylor rule parameters; rates are annual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CentralBankConfig {
    pub active: bool,
    pub inflation_target: f64,
    pub neutral_rate: f64,
    pub inflation_coefficient: f64,
    pub output_gap_coefficient: f64,
    /// Weight on the previous rate
    pub smoothing: f64,
    pub lower_bound: f64,
    /// Weight on the previous potential-output estimate
    pub potential_output_smoothing: f64,
}

impl Default for CentralBankConfig {
    fn default() -> Self {
        Self {
            active: true,
            inflation_target: 0.02,
            neutral_rate: 0.01,
            inflation_coefficient: 0.5,
            output_gap_coefficient: 0.5,
            smoothing: 0.8,
            lower_bound: 0.001,
            potential_output_smoothing: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernmentConfig {
    pub active: bool,
    pub corporate_tax_rate: f64,
    pub income_tax_rate: f64,
    /// Goods purchases as a fraction of trailing GDP
    pub spending_gdp_ratio: f64,
    /// Benefit per unemployed household as a fraction of the average wage
    pub unemployment_benefit_ratio: f64,
    /// Debt to annual GDP above which spending is cut
    pub debt_gdp_target: f64,
    pub adjustment_speed: f64,
}

impl Default for GovernmentConfig {
    fn default() -> Self {
        Self {
            active: true,
            corporate_tax_rate: 0.19,
            income_tax_rate: 0.20,
            spending_gdp_ratio: 0.2,
            unemployment_benefit_ratio: 0.4,
            debt_gdp_target: 0.85,
            adjustment_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    pub price_adjustment_speed: f64,
    pub quantity_adjustment_speed: f64,
    pub wage_stickiness: f64,
    /// Applicants a firm reviews per period
    pub matching_sample_size: usize,
    pub separation_rate: f64,
    /// When true a rejected credit application is not retried elsewhere
    pub credit_rationing: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            price_adjustment_speed: 0.5,
            quantity_adjustment_speed: 0.5,
            wage_stickiness: 0.8,
            matching_sample_size: 10,
            separation_rate: 0.05,
            credit_rationing: true,
        }
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Complete model configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub simulation: SimulationConfig,
    pub population: PopulationConfig,
    pub firm: FirmConfig,
    pub household: HouseholdConfig,
    pub bank: BankConfig,
    pub central_bank: CentralBankConfig,
    pub government: GovernmentConfig,
    pub markets: MarketConfig,
}

impl ModelConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: ModelConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a partial JSON document over this configuration
    ///
    /// Used for live parameter overrides between periods. The merged result
    /// goes through the same unknown-key and range checks as a fresh load;
    /// on error `self` is untouched.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, ConfigError> {
        let mut base =
            serde_json::to_value(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        merge_json(&mut base, overrides);
        Self::from_value(base)
    }

    /// Workers per unit of output for a sector, if the sector has an override
    pub fn sector_labour_coefficient(&self, sector: usize) -> Option<f64> {
        self.population
            .sectors
            .get(sector)
            .and_then(|name| self.firm.sector_labour_coefficients.get(name))
            .copied()
    }

    /// Per-period equivalent of an annual rate
    pub fn per_period(&self, annual_rate: f64) -> f64 {
        annual_rate / self.simulation.periods_per_year as f64
    }
}

fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

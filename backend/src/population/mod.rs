//! Initial population
//!
//! The engine starts from per-agent samples: firm financials, household
//! wealth and preferences, bank equity and the opening government debt.
//! Samples either come from an external calibration step or from
//! [`synthesize`], which draws them from the `population` config section.
//! Both paths go through [`InitialPopulation::validate`] before any agent
//! is built.
//!
//! # Key Principles
//!
//! 1. **Closed balance sheets**: [`build_world`] derives bank reserves so
//!    every bank's equity matches its sample and sector net worth sums to zero
//! 2. **Central bank holds the debt**: opening bond holdings equal the
//!    opening government debt
//! 3. **Deterministic synthesis**: same config, same population
//!
//! # Example
//!
//! ```
//! use macro_abm_core_rs::population::{build_world, synthesize};
//! use macro_abm_core_rs::ModelConfig;
//!
//! let mut config = ModelConfig::default();
//! config.population.firms = 5;
//! config.population.households = 20;
//! config.population.banks = 2;
//!
//! let population = synthesize(&config);
//! let world = build_world(&config, &population).unwrap();
//! assert_eq!(world.firms().len(), 5);
//! assert!(world.sector_balances().total().abs() < 1e-6 * world.sector_balances().scale());
//! ```

mod synthetic;

pub use synthetic::synthesize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModelConfig;
use crate::models::agent::Agent;
use crate::models::bank::{Bank, BankContext, BankSample};
use crate::models::central_bank::CentralBank;
use crate::models::firm::{Firm, FirmSample};
use crate::models::government::Government;
use crate::models::household::{Household, HouseholdSample};
use crate::models::ids::{house_bank, BankId, FirmId, HouseholdId};
use crate::models::state::{MarketStats, World};
use crate::rng::RngManager;

/// An initial sample violates an entity invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PopulationError {
    #[error("household {household} has negative initial wealth {wealth}")]
    NegativeWealth { household: usize, wealth: f64 },

    #[error("firm {firm} has initial equity {equity} below the tolerated floor {floor}")]
    InsolventFirm { firm: usize, equity: f64, floor: f64 },

    #[error("{entity} has a non-finite or non-positive {field}: {value}")]
    NonFinite {
        entity: String,
        field: &'static str,
        value: f64,
    },

    #[error("{entity} has {field} {value} outside [{low}, {high}]")]
    OutOfBounds {
        entity: String,
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },

    #[error("household {household} is assigned to firm {employer}, which does not exist")]
    EmptyEmployer { household: usize, employer: usize },

    #[error("{entity} has {field} {value}, but only {available} are configured")]
    OutOfRange {
        entity: String,
        field: &'static str,
        value: usize,
        available: usize,
    },

    #[error("the population has no banks")]
    NoBanks,
}

/// Complete set of initial samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialPopulation {
    pub firms: Vec<FirmSample>,
    pub households: Vec<HouseholdSample>,
    pub banks: Vec<BankSample>,
    pub government_debt: f64,
}

fn check_finite(entity: impl Fn() -> String, field: &'static str, value: f64) -> Result<(), PopulationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PopulationError::NonFinite {
            entity: entity(),
            field,
            value,
        })
    }
}

fn check_positive(entity: impl Fn() -> String, field: &'static str, value: f64) -> Result<(), PopulationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PopulationError::NonFinite {
            entity: entity(),
            field,
            value,
        })
    }
}

fn check_bounds(
    entity: impl Fn() -> String,
    field: &'static str,
    value: f64,
    low: f64,
    high: f64,
) -> Result<(), PopulationError> {
    check_finite(&entity, field, value)?;
    if (low..=high).contains(&value) {
        Ok(())
    } else {
        Err(PopulationError::OutOfBounds {
            entity: entity(),
            field,
            value,
            low,
            high,
        })
    }
}

fn check_index(
    entity: impl Fn() -> String,
    field: &'static str,
    value: usize,
    available: usize,
) -> Result<(), PopulationError> {
    if value < available {
        Ok(())
    } else {
        Err(PopulationError::OutOfRange {
            entity: entity(),
            field,
            value,
            available,
        })
    }
}

impl InitialPopulation {
    /// Check every sample against the entity invariants
    pub fn validate(&self, config: &ModelConfig) -> Result<(), PopulationError> {
        if self.banks.is_empty() {
            return Err(PopulationError::NoBanks);
        }
        let sectors = config.population.sectors.len();
        let regions = config.population.regions;
        let tolerance = config.firm.initial_equity_tolerance;

        for (i, s) in self.firms.iter().enumerate() {
            let entity = || FirmId(i).to_string();
            check_index(entity, "sector", s.sector, sectors)?;
            check_index(entity, "region", s.region, regions)?;
            for (field, value) in [
                ("capital", s.capital),
                ("cash", s.cash),
                ("debt", s.debt),
                ("inventory", s.inventory),
                ("expected_demand", s.expected_demand),
                ("revenue", s.revenue),
            ] {
                check_finite(entity, field, value)?;
            }
            check_positive(entity, "wage", s.wage)?;
            check_positive(entity, "productivity", s.productivity)?;

            let firm = Firm::from_sample(FirmId(i), s, BankId(0), config, 0);
            let floor = -tolerance * s.capital.max(0.0);
            if firm.equity() < floor {
                return Err(PopulationError::InsolventFirm {
                    firm: i,
                    equity: firm.equity(),
                    floor,
                });
            }
        }

        for (i, s) in self.households.iter().enumerate() {
            let entity = || HouseholdId(i).to_string();
            check_index(entity, "region", s.region, regions)?;
            check_finite(entity, "wealth", s.wealth)?;
            check_bounds(entity, "propensity_to_consume", s.propensity_to_consume, 0.0, 1.0)?;
            check_bounds(entity, "reservation_wage", s.reservation_wage, 0.0, f64::MAX)?;
            if s.wealth < 0.0 {
                return Err(PopulationError::NegativeWealth {
                    household: i,
                    wealth: s.wealth,
                });
            }
            if let Some(employer) = s.employer {
                if employer >= self.firms.len() {
                    return Err(PopulationError::EmptyEmployer {
                        household: i,
                        employer,
                    });
                }
            }
        }

        for (i, s) in self.banks.iter().enumerate() {
            check_finite(|| BankId(i).to_string(), "equity", s.equity)?;
        }
        check_finite(|| "government".to_string(), "debt", self.government_debt)?;
        Ok(())
    }
}

/// Validate the samples and assemble the opening World
pub fn build_world(
    config: &ModelConfig,
    population: &InitialPopulation,
) -> Result<World, PopulationError> {
    population.validate(config)?;
    let bank_count = population.banks.len();

    let firms: Vec<Firm> = population
        .firms
        .iter()
        .enumerate()
        .map(|(i, s)| Firm::from_sample(FirmId(i), s, house_bank(i, bank_count), config, 0))
        .collect();
    let households: Vec<Household> = population
        .households
        .iter()
        .enumerate()
        .map(|(i, s)| Household::from_sample(HouseholdId(i), s, house_bank(i, bank_count)))
        .collect();

    let real_output: f64 = firms.iter().map(|f| f.expected_demand).sum();
    let central_bank = CentralBank::new(&config.central_bank, population.government_debt, real_output);

    let mut banks: Vec<Bank> = (0..bank_count).map(|b| Bank::new(BankId(b))).collect();
    let mut rng = RngManager::new(config.simulation.seed);
    for bank in &mut banks {
        bank.step(
            &BankContext {
                config: &config.bank,
                policy_rate: central_bank.policy_rate(),
            },
            &mut rng,
        );
    }
    for firm in firms.iter().filter(|f| f.debt > 0.0) {
        banks[firm.house_bank.index()].originate(firm.id, firm.debt, 0, config.bank.loan_maturity);
    }
    for bank in &mut banks {
        bank.flows = Default::default();
    }

    let mut world = World::new(
        firms,
        households,
        banks,
        central_bank,
        Government::new(population.government_debt),
        MarketStats {
            price_index: 0.0,
            average_wage: 0.0,
            nominal_gdp: 0.0,
            real_gdp: 0.0,
            unemployment_rate: 0.0,
            sector_wages: Vec::new(),
        },
    );

    for (i, s) in population.households.iter().enumerate() {
        if let Some(employer) = s.employer {
            let wage = world.firms()[employer].wage;
            world.hire(FirmId(employer), HouseholdId(i), wage);
        }
    }

    // reserves close each bank's balance sheet at its sampled equity
    world.refresh_bank_positions();
    for (bank, sample) in world.banks_mut().iter_mut().zip(&population.banks) {
        bank.reserves = sample.equity - bank.loans() - bank.overdrafts + bank.deposits;
        bank.equity_at_open = bank.equity();
        bank.loans_at_open = bank.loans();
    }

    let stats = opening_stats(&world, config);
    *world.stats_mut() = stats;
    Ok(world)
}

/// Market aggregates implied by the opening plans
fn opening_stats(world: &World, config: &ModelConfig) -> MarketStats {
    let (value, units) = world
        .firms()
        .iter()
        .fold((0.0, 0.0), |(v, u), f| (v + f.price * f.expected_demand, u + f.expected_demand));
    let price_index = if units > 0.0 {
        value / units
    } else {
        world.mean_price().unwrap_or(1.0)
    };
    let average_wage = world
        .mean_wage()
        .or_else(|| {
            let firms = world.firms();
            (!firms.is_empty()).then(|| firms.iter().map(|f| f.wage).sum::<f64>() / firms.len() as f64)
        })
        .unwrap_or(config.population.wage_mean);

    MarketStats {
        price_index,
        average_wage,
        nominal_gdp: value,
        real_gdp: units,
        unemployment_rate: world.unemployment_rate(),
        sector_wages: world.sector_wages(config.population.sectors.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ModelConfig {
        let mut config = ModelConfig::default();
        config.population.firms = 4;
        config.population.households = 16;
        config.population.banks = 2;
        config
    }

    #[test]
    fn test_negative_wealth_rejected() {
        let config = small_config();
        let mut population = synthesize(&config);
        population.households[3].wealth = -1.0;
        assert_eq!(
            population.validate(&config),
            Err(PopulationError::NegativeWealth {
                household: 3,
                wealth: -1.0
            })
        );
    }

    #[test]
    fn test_missing_employer_rejected() {
        let config = small_config();
        let mut population = synthesize(&config);
        population.households[0].employer = Some(99);
        assert!(matches!(
            population.validate(&config),
            Err(PopulationError::EmptyEmployer { employer: 99, .. })
        ));
    }

    #[test]
    fn test_deeply_insolvent_firm_rejected() {
        let config = small_config();
        let mut population = synthesize(&config);
        population.firms[1].debt = population.firms[1].capital * 10.0;
        assert!(matches!(
            population.validate(&config),
            Err(PopulationError::InsolventFirm { firm: 1, .. })
        ));
    }

    #[test]
    fn test_household_behaviour_out_of_bounds_rejected() {
        let config = small_config();
        let mut population = synthesize(&config);
        population.households[2].propensity_to_consume = 1.2;
        assert_eq!(
            population.validate(&config),
            Err(PopulationError::OutOfBounds {
                entity: "H2".to_string(),
                field: "propensity_to_consume",
                value: 1.2,
                low: 0.0,
                high: 1.0,
            })
        );

        let mut population = synthesize(&config);
        population.households[5].reservation_wage = -10.0;
        assert!(matches!(
            population.validate(&config),
            Err(PopulationError::OutOfBounds { field: "reservation_wage", .. })
        ));

        let mut population = synthesize(&config);
        population.households[5].propensity_to_consume = f64::NAN;
        assert!(matches!(
            population.validate(&config),
            Err(PopulationError::NonFinite { field: "propensity_to_consume", .. })
        ));
    }

    #[test]
    fn test_nan_capital_rejected() {
        let config = small_config();
        let mut population = synthesize(&config);
        population.firms[0].capital = f64::NAN;
        assert!(matches!(
            population.validate(&config),
            Err(PopulationError::NonFinite { field: "capital", .. })
        ));
    }

    #[test]
    fn test_opening_world_closes() {
        let config = small_config();
        let world = build_world(&config, &synthesize(&config)).unwrap();
        let balances = world.sector_balances();
        assert!(balances.total().abs() < 1e-6 * balances.scale());
        assert!(world.employment_consistent());
        assert!((world.central_bank().bonds() - world.government().debt()).abs() < 1e-9);
        for firm in world.firms() {
            assert!((firm.debt() - world.debt_of(firm.id())).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bank_equity_matches_sample() {
        let config = small_config();
        let population = synthesize(&config);
        let world = build_world(&config, &population).unwrap();
        for (bank, sample) in world.banks().iter().zip(&population.banks) {
            assert!((bank.equity() - sample.equity).abs() < 1e-6);
        }
    }
}

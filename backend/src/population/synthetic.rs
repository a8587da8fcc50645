//! Synthetic initial population drawn from the `population` config section
//!
//! Wages and productivity are lognormal around their configured means,
//! household wealth is Pareto, propensity to consume is a clipped normal.
//! Firms are sized so that their opening workforce can produce their
//! expected demand with capacity to spare. Opening wealth is scaled so that
//! the first period's planned spending buys what firms expect to sell.

use super::InitialPopulation;
use crate::config::ModelConfig;
use crate::models::bank::BankSample;
use crate::models::firm::FirmSample;
use crate::models::household::HouseholdSample;
use crate::models::ids::house_bank;
use crate::rng::{RngManager, StreamKey};

/// Capital installed per unit of opening output capacity actually used
const CAPACITY_HEADROOM: f64 = 1.5;
/// Least mean opening household wealth, in periods of mean wage
const MIN_WEALTH_IN_WAGES: f64 = 4.0;
/// Relative dispersion of wages and productivity across firms
const DISPERSION: f64 = 0.2;

/// Draw a population. Deterministic in the config (seed included).
pub fn synthesize(config: &ModelConfig) -> InitialPopulation {
    let p = &config.population;
    let mut rng = RngManager::substream(config.simulation.seed, StreamKey::System, 0, 0);
    let regions = p.regions.max(1);
    let sectors = p.sectors.len().max(1);

    let wages: Vec<f64> = (0..p.firms)
        .map(|_| rng.lognormal(p.wage_mean, DISPERSION * p.wage_mean))
        .collect();
    let productivities: Vec<f64> = (0..p.firms)
        .map(|_| rng.lognormal(p.productivity_mean, DISPERSION * p.productivity_mean))
        .collect();

    // Employment: a shuffled subset of households, assigned round-robin to
    // the firms of their own region
    let mut households: Vec<HouseholdSample> = (0..p.households)
        .map(|i| {
            // unit mean for now; rescaled once firms are known
            let wealth_scale = if p.wealth_shape > 1.0 {
                (p.wealth_shape - 1.0) / p.wealth_shape
            } else {
                1.0
            };
            HouseholdSample {
                region: i % regions,
                income_decile: 1,
                wealth: rng.pareto(p.wealth_shape, wealth_scale),
                propensity_to_consume: rng
                    .normal(config.household.mpc_mean, config.household.mpc_std)
                    .clamp(0.1, 0.99),
                reservation_wage: config.household.reservation_wage_ratio * p.wage_mean,
                employer: None,
            }
        })
        .collect();

    let mut firms_by_region: Vec<Vec<usize>> = vec![Vec::new(); regions];
    for firm in 0..p.firms {
        firms_by_region[firm % regions].push(firm);
    }
    let employed_target =
        ((p.households as f64) * (1.0 - p.initial_unemployment_rate)).round() as usize;
    let mut order: Vec<usize> = (0..p.households).collect();
    rng.shuffle(&mut order);
    let mut next_slot = vec![0usize; regions];
    let mut workforce = vec![0usize; p.firms];
    for &h in order.iter().take(employed_target) {
        let region = households[h].region;
        let candidates = &firms_by_region[region];
        if candidates.is_empty() {
            continue;
        }
        let firm = candidates[next_slot[region] % candidates.len()];
        next_slot[region] += 1;
        households[h].employer = Some(firm);
        workforce[firm] += 1;
    }

    let firms: Vec<FirmSample> = (0..p.firms)
        .map(|i| {
            let sector = i % sectors;
            let coefficient = config
                .sector_labour_coefficient(sector)
                .unwrap_or(1.0 / productivities[i]);
            let workers = workforce[i].max(1) as f64;
            let expected_demand = workers / coefficient;
            let capital = CAPACITY_HEADROOM * expected_demand / config.firm.capacity_per_capital;
            let price = wages[i] * coefficient * (1.0 + config.firm.initial_markup);
            FirmSample {
                sector,
                region: i % regions,
                capital,
                cash: wages[i] * workforce[i] as f64,
                debt: p.firm_leverage * capital,
                inventory: config.firm.inventory_target_ratio * expected_demand,
                wage: wages[i],
                productivity: productivities[i],
                expected_demand,
                revenue: price * expected_demand,
            }
        })
        .collect();

    let drawn: f64 = households.iter().map(|h| h.wealth).sum();
    if drawn > 0.0 {
        let factor = opening_wealth(config, &households, &firms) / drawn;
        for household in &mut households {
            household.wealth *= factor;
        }
    }
    assign_income_deciles(&mut households, &firms);

    let bank_count = p.banks.max(1);
    let mut bank_loans = vec![0.0; bank_count];
    for (i, firm) in firms.iter().enumerate() {
        bank_loans[house_bank(i, bank_count).index()] += firm.debt;
    }
    let banks = bank_loans
        .into_iter()
        .map(|loans| BankSample {
            equity: p.bank_capital_ratio * loans,
        })
        .collect();

    let nominal_output: f64 = firms.iter().map(|f| f.revenue).sum();
    let government_debt = config.government.debt_gdp_target
        * nominal_output
        * config.simulation.periods_per_year as f64;

    InitialPopulation {
        firms,
        households,
        banks,
        government_debt,
    }
}

/// Total household wealth whose draw closes the gap between opening supply
/// and the spending that income and government purchases already cover
fn opening_wealth(config: &ModelConfig, households: &[HouseholdSample], firms: &[FirmSample]) -> f64 {
    let p = &config.population;
    let floor = MIN_WEALTH_IN_WAGES * p.wage_mean * households.len() as f64;
    let draw_rate = config.household.wealth_draw_rate;
    if draw_rate <= 0.0 {
        return floor;
    }

    let tax_rate = config.government.income_tax_rate;
    let benefit = config.government.unemployment_benefit_ratio * p.wage_mean;
    let income_spending: f64 = households
        .iter()
        .map(|h| {
            let disposable = h.employer.map_or(benefit, |f| firms[f].wage * (1.0 - tax_rate));
            h.propensity_to_consume * disposable
        })
        .sum();
    let supply: f64 = firms.iter().map(|f| f.revenue).sum();
    let government = config.government.spending_gdp_ratio * supply;

    let gap = (supply - income_spending - government).max(0.0);
    (gap / draw_rate).max(floor)
}

/// Rank households by opening wage income, then wealth, into deciles 1..=10
fn assign_income_deciles(households: &mut [HouseholdSample], firms: &[FirmSample]) {
    let n = households.len();
    if n == 0 {
        return;
    }
    let income = |h: &HouseholdSample| h.employer.map_or(0.0, |f| firms[f].wage);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        income(&households[a])
            .total_cmp(&income(&households[b]))
            .then(households[a].wealth.total_cmp(&households[b].wealth))
            .then(a.cmp(&b))
    });
    for (rank, &h) in order.iter().enumerate() {
        households[h].income_decile = (1 + rank * 10 / n) as u8;
    }
}

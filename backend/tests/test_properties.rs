//! Property tests over market clearing, policy bounds and whole runs

use std::collections::{BTreeMap, BTreeSet};

use macro_abm_core_rs::markets::{GoodsMarket, GoodsOffer, LabourMarket, Seeker, Vacancy};
use macro_abm_core_rs::models::central_bank::{CentralBank, CentralBankContext};
use macro_abm_core_rs::models::ids::{FirmId, HouseholdId};
use macro_abm_core_rs::{run, Agent, Event, ModelConfig, RngManager, Simulation};
use proptest::prelude::*;

fn tiny_config(seed: u64) -> ModelConfig {
    let mut config = ModelConfig::default();
    config.simulation.seed = seed;
    config.simulation.periods = 4;
    config.population.firms = 5;
    config.population.households = 30;
    config.population.banks = 2;
    config
}

/// Larger and harsher than `tiny_config`, so firms die during the run
fn churning_config(seed: u64) -> ModelConfig {
    let mut config = tiny_config(seed);
    config.simulation.periods = 30;
    config.population.firms = 12;
    config.population.households = 60;
    config.population.banks = 3;
    config.population.regions = 2;
    config.firm.insolvency_threshold = 1;
    config
}

fn offers() -> impl Strategy<Value = Vec<GoodsOffer>> {
    prop::collection::vec((0.1_f64..50.0, 0.0_f64..500.0), 0..12).prop_map(|v| {
        v.into_iter()
            .enumerate()
            .map(|(i, (price, supply))| GoodsOffer {
                firm: FirmId(i),
                price,
                supply,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn goods_sales_bounded_by_demand_and_supply(offers in offers(), demand in 0.0_f64..10_000.0) {
        let outcome = GoodsMarket::clear(&offers, demand);
        prop_assert!(outcome.sales <= demand * (1.0 + 1e-9) + 1e-9);
        prop_assert!((0.0..=1.0 + 1e-9).contains(&outcome.fill_ratio));
        for (offer, allocation) in offers.iter().zip(&outcome.allocations) {
            prop_assert_eq!(offer.firm, allocation.firm);
            prop_assert!(allocation.sold_units <= offer.supply + 1e-9);
            prop_assert!(allocation.sold_units <= allocation.demanded_units + 1e-9);
        }
    }

    #[test]
    fn cheaper_offer_never_gets_smaller_weight(
        p1 in 0.1_f64..50.0,
        p2 in 0.1_f64..50.0,
        supply in 1.0_f64..100.0,
    ) {
        prop_assume!(p1 != p2);
        let offers = [
            GoodsOffer { firm: FirmId(0), price: p1, supply },
            GoodsOffer { firm: FirmId(1), price: p2, supply },
        ];
        let weights = GoodsMarket::weights(&offers);
        if p1 < p2 {
            prop_assert!(weights[0] > weights[1]);
        } else {
            prop_assert!(weights[1] > weights[0]);
        }
    }

    #[test]
    fn matches_respect_reservation_wages_and_slots(
        slots in prop::collection::vec((1_usize..4, 500.0_f64..1_500.0), 1..6),
        reservations in prop::collection::vec(400.0_f64..1_600.0, 1..30),
        period in 1_usize..50,
    ) {
        let config = ModelConfig::default();
        let vacancies: Vec<Vacancy> = slots
            .iter()
            .enumerate()
            .map(|(i, &(n, wage))| Vacancy { firm: FirmId(i), region: 0, slots: n, wage_offer: wage })
            .collect();
        let seekers: Vec<Seeker> = reservations
            .iter()
            .enumerate()
            .map(|(i, &r)| Seeker { household: HouseholdId(i), region: 0, reservation_wage: r })
            .collect();

        let matches = LabourMarket::new(&config, period).match_seekers(&vacancies, &seekers);

        let mut hired = BTreeSet::new();
        let mut per_firm: BTreeMap<FirmId, usize> = BTreeMap::new();
        for m in &matches {
            prop_assert!(hired.insert(m.household), "{} hired twice", m.household);
            prop_assert!(reservations[m.household.index()] <= m.wage);
            *per_firm.entry(m.firm).or_default() += 1;
        }
        for vacancy in &vacancies {
            prop_assert!(per_firm.get(&vacancy.firm).copied().unwrap_or(0) <= vacancy.slots);
        }
    }

    #[test]
    fn policy_rate_never_breaches_lower_bound(
        inflation in -0.9_f64..0.5,
        steps in 1_usize..40,
        lower_bound in 0.0_f64..0.02,
    ) {
        let mut config = ModelConfig::default().central_bank;
        config.lower_bound = lower_bound;
        let mut cb = CentralBank::new(&config, 0.0, 100.0);
        cb.set_observed_inflation(inflation);
        for _ in 0..steps {
            let rate = cb.step(&CentralBankContext { config: &config }, &mut RngManager::new(1));
            prop_assert!(rate >= lower_bound);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn runs_are_reproducible(seed in 1_u64..10_000) {
        prop_assert_eq!(run(tiny_config(seed)).unwrap(), run(tiny_config(seed)).unwrap());
    }

    #[test]
    fn books_close_for_any_seed(seed in 1_u64..10_000) {
        let mut sim = Simulation::new(tiny_config(seed)).unwrap();
        while !sim.is_finished() {
            sim.step().unwrap();
            let check = sim.last_stock_flow_check().unwrap();
            prop_assert!(check.is_consistent(1e-6), "residual {}", check.residual);
            prop_assert!(sim.world().employment_consistent());
        }
    }

    #[test]
    fn stocks_stay_non_negative_and_dead_firms_stay_out(seed in 1_u64..10_000) {
        let mut sim = Simulation::new(churning_config(seed)).unwrap();
        while !sim.is_finished() {
            let period = sim.step().unwrap().period;
            let world = sim.world();

            for h in world.households() {
                prop_assert!(h.wealth() >= -1e-9, "{} wealth {} in period {}", h.id(), h.wealth(), period);
            }
            for b in world.banks() {
                prop_assert!(b.deposits() >= -1e-9, "{} deposits {}", b.id(), b.deposits());
            }
            for f in world.firms() {
                prop_assert!(f.inventory() >= 0.0, "{} inventory {}", f.id(), f.inventory());
                let Some(died) = f.died() else { continue };
                prop_assert!(!f.is_alive());
                if died < period {
                    prop_assert_eq!(f.flows().units_sold, 0.0);
                    prop_assert_eq!(f.vacancies(), 0);
                    prop_assert!(f.employees().is_empty());
                    let applied = sim.event_log().events_in_period(period).into_iter().any(|e| {
                        matches!(
                            e,
                            Event::LoanApproved { firm, .. } | Event::LoanRejected { firm, .. }
                                if *firm == f.id()
                        )
                    });
                    prop_assert!(!applied, "dead {} applied for credit in period {}", f.id(), period);
                }
            }
        }
    }
}

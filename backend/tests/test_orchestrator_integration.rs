//! End-to-end runs through the public simulation API

use macro_abm_core_rs::models::ids::FirmId;
use macro_abm_core_rs::population::synthesize;
use macro_abm_core_rs::{
    run, run_with_micro, run_with_population, ConfigError, Event, Market, ModelConfig, Shock,
    Simulation, SimulationError,
};
use serde_json::json;

fn small_config(periods: usize) -> ModelConfig {
    let mut config = ModelConfig::default();
    config.simulation.periods = periods;
    config.simulation.seed = 42;
    config.population.firms = 10;
    config.population.households = 50;
    config.population.banks = 2;
    config
}

#[test]
fn test_small_economy_runs_to_completion() {
    let records = run(small_config(5)).unwrap();
    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.period, i + 1);
        assert!(record.gdp >= 0.0);
        assert!(record.price_index > 0.0);
        assert!((0.0..=1.0).contains(&record.unemployment_rate));
        assert!(record.policy_rate >= 0.001);
    }
}

#[test]
fn test_opening_demand_absorbs_opening_output() {
    let config = small_config(3);
    let population = synthesize(&config);
    let opening_output: f64 = population.firms.iter().map(|f| f.revenue).sum();

    let records = run_with_population(config, &population).unwrap();
    assert!(
        records[0].gdp > 0.85 * opening_output,
        "sales {} against opening output {}",
        records[0].gdp,
        opening_output
    );
    assert!(records[2].unemployment_rate < 0.25, "{}", records[2].unemployment_rate);
}

#[test]
fn test_negative_equity_firm_exits_and_releases_workers() {
    let mut config = small_config(6);
    config.firm.entry_rate = 0.0;
    config.firm.insolvency_threshold = 3;

    let mut population = synthesize(&config);
    let firm = &mut population.firms[0];
    firm.cash = 0.0;
    firm.inventory = 0.0;
    firm.debt = 1.99 * firm.capital;

    let mut sim = Simulation::with_population(config, &population).unwrap();
    for _ in 0..2 {
        sim.step().unwrap();
        assert!(sim.world().firm(FirmId(0)).unwrap().is_alive());
    }
    sim.step().unwrap();
    let f0 = sim.world().firm(FirmId(0)).unwrap();
    assert!(!f0.is_alive());
    assert_eq!(f0.died(), Some(3));
    assert_eq!(f0.debt(), 0.0);
    assert!(sim
        .event_log()
        .events_in_period(3)
        .iter()
        .any(|e| matches!(e, Event::FirmExit { firm: FirmId(0), .. })));

    for period in 3..=6 {
        if period > 3 {
            sim.step().unwrap();
        }
        let world = sim.world();
        assert!(world.firm(FirmId(0)).unwrap().employees().is_empty());
        assert!(
            world.households().iter().all(|h| h.employer() != Some(FirmId(0))),
            "a household still works for the dead firm in period {period}"
        );
        assert!(world.employment_consistent());
    }
    assert!(sim.records()[2].firm_bankruptcies >= 1);
    assert!(sim.records().last().unwrap().live_firms <= 9);
}

#[test]
fn test_policy_rate_respects_lower_bound_under_deflation() {
    let mut config = small_config(50);
    config.central_bank.lower_bound = 0.001;
    let mut sim = Simulation::new(config).unwrap();
    sim.world_mut().central_bank_mut().set_observed_inflation(-0.5);
    sim.apply_shock(Shock::PriceLevel(0.5));

    let first = sim.step().unwrap();
    assert!((first.policy_rate - 0.001).abs() < 1e-12);
    while !sim.is_finished() {
        let record = sim.step().unwrap();
        assert!(record.policy_rate >= 0.001, "period {}", record.period);
    }
    assert_eq!(sim.records().len(), 50);
}

#[test]
fn test_empty_economy_warns_and_continues() {
    let mut config = small_config(3);
    config.population.firms = 0;
    let mut sim = Simulation::new(config).unwrap();
    sim.run_to_end().unwrap();

    assert_eq!(sim.records().len(), 3);
    assert!(sim.records().iter().all(|r| r.gdp == 0.0));
    let starvations: Vec<Market> = sim
        .event_log()
        .events_of_type("MarketStarvation")
        .into_iter()
        .filter_map(|e| match e {
            Event::MarketStarvation { market, .. } => Some(*market),
            _ => None,
        })
        .collect();
    assert!(starvations.contains(&Market::Labour));
    assert!(starvations.contains(&Market::Goods));
    assert!(!starvations.contains(&Market::Credit));
}

#[test]
fn test_empty_economy_halts_when_configured() {
    let mut config = small_config(3);
    config.population.firms = 0;
    config.simulation.halt_on_market_starvation = true;

    let failure = run(config).unwrap_err();
    assert!(failure.records.is_empty());
    assert_eq!(
        failure.error,
        SimulationError::MarketStarvation {
            period: 1,
            market: Market::Labour
        }
    );
}

#[test]
fn test_invalid_config_fails_before_first_period() {
    let mut config = small_config(3);
    config.population.banks = 0;
    let failure = run(config).unwrap_err();
    assert!(failure.records.is_empty());
    assert!(matches!(
        failure.error,
        SimulationError::Configuration(ConfigError::OutOfRange { .. })
    ));
}

#[test]
fn test_population_errors_surface() {
    let config = small_config(3);
    let mut population = synthesize(&config);
    population.households[0].wealth = -1.0;
    let failure = run_with_population(config, &population).unwrap_err();
    assert!(matches!(failure.error, SimulationError::Population(_)));
}

#[test]
fn test_micro_run_reports_every_agent() {
    let config = small_config(4);
    let micro = run_with_micro(config.clone()).unwrap();
    assert_eq!(micro.records.len(), 4);

    let live_firms = micro.records.last().unwrap().live_firms;
    let firm_snapshots = micro.agents.iter().filter(|a| a.kind() == "Firm").count();
    assert!(firm_snapshots >= live_firms);
    assert_eq!(micro.agents.iter().filter(|a| a.kind() == "Household").count(), 50);
    assert_eq!(micro.agents.iter().filter(|a| a.kind() == "Bank").count(), 2);
    assert_eq!(micro.agents.iter().filter(|a| a.kind() == "CentralBank").count(), 1);
    assert_eq!(micro.agents.iter().filter(|a| a.kind() == "Government").count(), 1);

    assert_eq!(micro.records, run(config).unwrap());
}

#[test]
fn test_overrides_take_effect_between_periods() {
    let mut sim = Simulation::new(small_config(3)).unwrap();
    sim.run_to_end().unwrap();
    assert!(sim.is_finished());

    sim.apply_overrides(&json!({
        "simulation": { "periods": 5 },
        "government": { "income_tax_rate": 0.25 }
    }))
    .unwrap();
    assert!(!sim.is_finished());
    assert_eq!(sim.config().government.income_tax_rate, 0.25);

    sim.run_to_end().unwrap();
    assert_eq!(sim.records().len(), 5);
}

#[test]
fn test_rejected_override_keeps_old_config() {
    let mut sim = Simulation::new(small_config(3)).unwrap();
    let before = sim.config().clone();

    let err = sim
        .apply_overrides(&json!({ "firm": { "entry_rate": 1.5 } }))
        .unwrap_err();
    assert!(matches!(err, SimulationError::Configuration(_)));
    let err = sim
        .apply_overrides(&json!({ "firm": { "no_such_knob": 1 } }))
        .unwrap_err();
    assert!(matches!(err, SimulationError::Configuration(ConfigError::Parse(_))));
    assert_eq!(sim.config(), &before);
}

#[test]
fn test_productivity_shock_scales_live_firms() {
    let mut sim = Simulation::new(small_config(3)).unwrap();
    let before: Vec<f64> = sim.world().firms().iter().map(|f| f.productivity()).collect();
    sim.apply_shock(Shock::Productivity(2.0));
    for (firm, old) in sim.world().firms().iter().zip(before) {
        assert!((firm.productivity() - 2.0 * old).abs() < 1e-9);
    }
    sim.step().unwrap();
}

#[test]
fn test_stepping_past_configured_end_is_allowed() {
    let mut sim = Simulation::new(small_config(2)).unwrap();
    sim.run_to_end().unwrap();
    let record = sim.step().unwrap();
    assert_eq!(record.period, 3);
    assert_eq!(sim.current_period(), 3);
}

#[test]
fn test_events_are_tagged_with_committed_periods() {
    let mut sim = Simulation::new(small_config(4)).unwrap();
    sim.run_to_end().unwrap();
    assert!(sim
        .event_log()
        .events()
        .iter()
        .all(|e| (1..=4).contains(&e.period())));
    let hires = sim.event_log().events_of_type("Hired").len();
    let employed_at_end = sim.records().last().unwrap().total_employment;
    assert!(hires + 50 >= employed_at_end);
}

//! Accounting identities over committed periods

use macro_abm_core_rs::recorder::accounting::{bonds_match_debt, BankEquityCheck};
use macro_abm_core_rs::{ModelConfig, Simulation, StockFlowCheck};

fn config() -> ModelConfig {
    let mut config = ModelConfig::default();
    config.simulation.periods = 12;
    config.simulation.seed = 7;
    config.population.firms = 15;
    config.population.households = 90;
    config.population.banks = 3;
    config
}

#[test]
fn test_opening_world_is_consistent() {
    let sim = Simulation::new(config()).unwrap();
    let world = sim.world();
    let check = StockFlowCheck::measure(0, world, world.money_stock());
    assert!(check.is_consistent(1e-9), "residual {}", check.residual);
    assert_eq!(check.money_change, 0.0);
    assert!(bonds_match_debt(world, 1e-9));
}

#[test]
fn test_sector_balances_close_every_period() {
    let mut sim = Simulation::new(config()).unwrap();
    while !sim.is_finished() {
        let opening_money = sim.world().money_stock();
        let record = sim.step().unwrap();

        let check = sim.last_stock_flow_check().unwrap();
        assert_eq!(check.period, record.period);
        assert!(
            check.is_consistent(1e-6),
            "period {}: residual {}",
            record.period,
            check.residual
        );
        assert!((check.money_change - (record.money_stock - opening_money)).abs() < 1e-6);
        assert_eq!(record.stock_flow_residual, check.residual);
    }
}

#[test]
fn test_bank_equity_moves_only_by_net_income() {
    let mut sim = Simulation::new(config()).unwrap();
    for _ in 0..8 {
        sim.step().unwrap();
        for check in BankEquityCheck::measure(sim.world()) {
            assert!(
                check.is_consistent(1e-6),
                "bank {} equity moved {} against net income {}",
                check.bank,
                check.equity_change,
                check.net_income
            );
        }
    }
}

#[test]
fn test_central_bank_holds_all_government_debt() {
    let mut sim = Simulation::new(config()).unwrap();
    sim.run_to_end().unwrap();
    assert!(bonds_match_debt(sim.world(), 1e-9));

    let world = sim.world();
    let record = sim.records().last().unwrap();
    assert!((record.government_debt - world.government().debt()).abs() < 1e-9);
}

#[test]
fn test_firm_debt_matches_loan_books() {
    let mut sim = Simulation::new(config()).unwrap();
    sim.run_to_end().unwrap();
    let world = sim.world();
    for firm in world.firms() {
        assert!(
            (firm.debt() - world.debt_of(firm.id())).abs() < 1e-6,
            "{} carries debt {} but banks hold {}",
            firm.id(),
            firm.debt(),
            world.debt_of(firm.id())
        );
    }
    let record = sim.records().last().unwrap();
    assert!((record.total_lending - world.total_loans()).abs() < 1e-6);
}

#[test]
fn test_employment_links_stay_symmetric() {
    let mut sim = Simulation::new(config()).unwrap();
    for _ in 0..6 {
        let record = sim.step().unwrap();
        assert!(sim.world().employment_consistent());
        assert_eq!(record.total_employment, sim.world().employed_count());
    }
}

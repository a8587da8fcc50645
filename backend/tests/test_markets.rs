//! Goods, labour and credit clearing through the public market APIs

use macro_abm_core_rs::markets::{CreditMarket, GoodsMarket, GoodsOffer, LabourMarket, Seeker, Vacancy};
use macro_abm_core_rs::models::bank::{BankSample, RejectionReason};
use macro_abm_core_rs::models::firm::FirmSample;
use macro_abm_core_rs::models::household::HouseholdSample;
use macro_abm_core_rs::models::ids::{BankId, FirmId, HouseholdId};
use macro_abm_core_rs::population::build_world;
use macro_abm_core_rs::{Event, InitialPopulation, ModelConfig};

// ============================================================================
// Goods
// ============================================================================

fn offer(firm: usize, price: f64, supply: f64) -> GoodsOffer {
    GoodsOffer {
        firm: FirmId(firm),
        price,
        supply,
    }
}

#[test]
fn test_cheaper_firm_gets_larger_share() {
    let outcome = GoodsMarket::clear(&[offer(0, 1.0, 1_000.0), offer(1, 2.0, 1_000.0)], 300.0);
    // weights 1.5 and 0.75: nominal shares 200 and 100
    assert!((outcome.allocations[0].demanded_units - 200.0).abs() < 1e-9);
    assert!((outcome.allocations[1].demanded_units - 50.0).abs() < 1e-9);
    assert!((outcome.sales - 300.0).abs() < 1e-9);
    assert!((outcome.fill_ratio - 1.0).abs() < 1e-12);
    assert!((outcome.price_index().unwrap() - 300.0 / 250.0).abs() < 1e-12);
}

#[test]
fn test_equal_prices_split_by_supply() {
    let outcome = GoodsMarket::clear(&[offer(0, 2.0, 30.0), offer(1, 2.0, 10.0)], 40.0);
    assert!((outcome.allocations[0].sold_units - 15.0).abs() < 1e-9);
    assert!((outcome.allocations[1].sold_units - 5.0).abs() < 1e-9);
}

#[test]
fn test_unserved_demand_is_not_redirected() {
    let outcome = GoodsMarket::clear(&[offer(0, 1.0, 5.0), offer(1, 2.0, 1_000.0)], 300.0);
    let cheap = outcome.allocations[0];
    assert!((cheap.demanded_units - 200.0).abs() < 1e-9);
    assert!((cheap.sold_units - 5.0).abs() < 1e-9);
    // the expensive firm still only sees its own share
    assert!((outcome.allocations[1].sold_units - 50.0).abs() < 1e-9);
    assert!((outcome.sales - 105.0).abs() < 1e-9);
    assert!((outcome.fill_ratio - 0.35).abs() < 1e-12);
}

#[test]
fn test_no_offers_or_no_demand_sells_nothing() {
    let empty = GoodsMarket::clear(&[], 100.0);
    assert!(empty.allocations.is_empty());
    assert_eq!(empty.sales, 0.0);
    assert_eq!(empty.price_index(), None);

    let idle = GoodsMarket::clear(&[offer(0, 1.0, 10.0)], 0.0);
    assert_eq!(idle.units_sold, 0.0);
    assert_eq!(idle.fill_ratio, 0.0);
}

// ============================================================================
// Labour
// ============================================================================

fn seeker(household: usize, region: usize, reservation_wage: f64) -> Seeker {
    Seeker {
        household: HouseholdId(household),
        region,
        reservation_wage,
    }
}

#[test]
fn test_highest_acceptable_ratio_is_hired() {
    let config = ModelConfig::default();
    let market = LabourMarket::new(&config, 1);
    let vacancies = [Vacancy {
        firm: FirmId(0),
        region: 0,
        slots: 1,
        wage_offer: 1_000.0,
    }];
    let seekers = [seeker(0, 0, 900.0), seeker(1, 0, 950.0), seeker(2, 0, 1_100.0)];

    let matches = market.match_seekers(&vacancies, &seekers);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].household, HouseholdId(1));
    assert_eq!(matches[0].wage, 1_000.0);
}

#[test]
fn test_seekers_above_offer_stay_unmatched() {
    let config = ModelConfig::default();
    let market = LabourMarket::new(&config, 1);
    let vacancies = [Vacancy {
        firm: FirmId(0),
        region: 0,
        slots: 3,
        wage_offer: 500.0,
    }];
    let matches = market.match_seekers(&vacancies, &[seeker(0, 0, 900.0), seeker(1, 0, 600.0)]);
    assert!(matches.is_empty());
}

#[test]
fn test_search_is_regional() {
    let config = ModelConfig::default();
    let market = LabourMarket::new(&config, 1);
    let vacancies = [Vacancy {
        firm: FirmId(0),
        region: 0,
        slots: 2,
        wage_offer: 1_000.0,
    }];
    let matches = market.match_seekers(&vacancies, &[seeker(0, 1, 100.0), seeker(1, 0, 100.0)]);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].household, HouseholdId(1));
}

#[test]
fn test_equal_ratios_prefer_lower_id() {
    let config = ModelConfig::default();
    let market = LabourMarket::new(&config, 3);
    let vacancies = [Vacancy {
        firm: FirmId(0),
        region: 0,
        slots: 1,
        wage_offer: 1_000.0,
    }];
    let matches = market.match_seekers(&vacancies, &[seeker(4, 0, 800.0), seeker(7, 0, 800.0)]);
    assert_eq!(matches[0].household, HouseholdId(4));
}

#[test]
fn test_matching_is_deterministic() {
    let config = ModelConfig::default();
    let vacancies: Vec<Vacancy> = (0..4)
        .map(|f| Vacancy {
            firm: FirmId(f),
            region: 0,
            slots: 2,
            wage_offer: 900.0 + 50.0 * f as f64,
        })
        .collect();
    let seekers: Vec<Seeker> = (0..20).map(|h| seeker(h, 0, 700.0 + 10.0 * h as f64)).collect();
    let a = LabourMarket::new(&config, 5).match_seekers(&vacancies, &seekers);
    let b = LabourMarket::new(&config, 5).match_seekers(&vacancies, &seekers);
    assert_eq!(a, b);
    assert!(a.len() <= 8);
}

// ============================================================================
// Credit
// ============================================================================

/// Two cashless firms with two workers each; firm 0 is creditworthy,
/// firm 1 has no revenue to service a loan from.
fn credit_population() -> InitialPopulation {
    let firm = |revenue: f64| FirmSample {
        sector: 0,
        region: 0,
        capital: 100_000.0,
        cash: 0.0,
        debt: 0.0,
        inventory: 0.0,
        wage: 1_000.0,
        productivity: 10.0,
        expected_demand: 20.0,
        revenue,
    };
    let worker = |employer: usize| HouseholdSample {
        region: 0,
        income_decile: 5,
        wealth: 1_000.0,
        propensity_to_consume: 0.8,
        reservation_wage: 900.0,
        employer: Some(employer),
    };
    InitialPopulation {
        firms: vec![firm(10_000.0), firm(0.0)],
        households: vec![worker(0), worker(0), worker(1), worker(1)],
        banks: vec![BankSample { equity: 50_000.0 }, BankSample { equity: 50_000.0 }],
        government_debt: 0.0,
    }
}

#[test]
fn test_cashless_firms_apply_for_wage_bill() {
    let config = ModelConfig::default();
    let world = build_world(&config, &credit_population()).unwrap();
    let applications = CreditMarket::new(&config, 1).applications(&world);
    assert_eq!(applications.len(), 2);
    for application in &applications {
        assert!((application.amount - 2_000.0).abs() < 1e-9);
    }
}

#[test]
fn test_rejections_recorded_while_lending_grows_without_rationing() {
    let mut config = ModelConfig::default();
    config.markets.credit_rationing = false;
    let mut world = build_world(&config, &credit_population()).unwrap();
    let lending_before = world.total_loans();

    let mut events = Vec::new();
    let outcome = CreditMarket::new(&config, 1).clear(&mut world, &mut events);

    assert_eq!(outcome.applications, 2);
    assert_eq!(outcome.approvals, 1);
    // firm 1 is turned down by its house bank and then by the other one
    assert_eq!(outcome.rejections, 2);
    assert!((outcome.new_lending - 2_000.0).abs() < 1e-9);
    assert!((world.total_loans() - lending_before - 2_000.0).abs() < 1e-9);
    assert!(!outcome.starved);

    let rejected: Vec<(BankId, FirmId, RejectionReason)> = events
        .iter()
        .filter_map(|e| match e {
            Event::LoanRejected { bank, firm, reason, .. } => Some((*bank, *firm, *reason)),
            _ => None,
        })
        .collect();
    assert_eq!(
        rejected,
        vec![
            (BankId(1), FirmId(1), RejectionReason::DebtServiceCoverage),
            (BankId(0), FirmId(1), RejectionReason::DebtServiceCoverage),
        ]
    );
    assert_eq!(world.banks()[1].flows().rejections, 1);
    assert_eq!(world.banks()[0].flows().rejections, 1);
    assert!((world.firm(FirmId(0)).unwrap().debt() - 2_000.0).abs() < 1e-9);
    assert_eq!(world.firm(FirmId(1)).unwrap().debt(), 0.0);
}

#[test]
fn test_rationing_stops_at_house_bank() {
    let config = ModelConfig::default();
    assert!(config.markets.credit_rationing);
    let mut world = build_world(&config, &credit_population()).unwrap();

    let mut events = Vec::new();
    let outcome = CreditMarket::new(&config, 1).clear(&mut world, &mut events);
    assert_eq!(outcome.approvals, 1);
    assert_eq!(outcome.rejections, 1);
}

#[test]
fn test_granted_loan_moves_money_to_firm() {
    let config = ModelConfig::default();
    let mut world = build_world(&config, &credit_population()).unwrap();
    let money_before = world.money_stock();

    let mut events = Vec::new();
    CreditMarket::new(&config, 1).clear(&mut world, &mut events);
    world.refresh_bank_positions();

    assert!((world.firm(FirmId(0)).unwrap().cash() - 2_000.0).abs() < 1e-9);
    assert!((world.money_stock() - money_before - 2_000.0).abs() < 1e-6);
    assert!(world.bank(BankId(0)).unwrap().loan_to(FirmId(0)).is_some());
}

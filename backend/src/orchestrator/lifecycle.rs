//! Firm exit and entry
//!
//! Exit runs before the banks close their books so that write-offs land
//! in the period the firm died. Entry runs after, and entrants start with
//! empty balance sheets: no money is created or destroyed by either step
//! beyond the recorded write-offs.

use tracing::debug;

use crate::config::ModelConfig;
use crate::core::phase::Phase;
use crate::models::event::Event;
use crate::models::firm::{Firm, FirmSample};
use crate::models::ids::{house_bank, Account, BankId, FirmId};
use crate::models::state::World;
use crate::rng::{RngManager, StreamKey};

/// Retire every live firm that has been insolvent for too long.
/// Returns the number of exits.
pub(crate) fn exit(
    world: &mut World,
    config: &ModelConfig,
    period: usize,
    events: &mut Vec<Event>,
) -> usize {
    let threshold = config.firm.insolvency_threshold;
    let mut exits = 0;

    for id in world.live_firm_ids() {
        let must_exit = world
            .firm_mut(id)
            .map_or(false, |f| f.assess_solvency(threshold));
        if !must_exit {
            continue;
        }
        let (equity, employees) = match world.firm(id) {
            Some(f) => (f.equity(), f.employees.clone()),
            None => continue,
        };

        for household in employees {
            world.release(household);
        }
        default_loans(world, id, period, events);
        let overdraft = world.write_off_overdraft(id);
        if let Some(firm) = world.firm_mut(id) {
            firm.mark_dead(period);
        }

        debug!(period, firm = %id, equity, overdraft, "firm exit");
        events.push(Event::FirmExit {
            period,
            firm: id,
            equity,
        });
        exits += 1;
    }
    exits
}

/// Recover what the firm's positive cash covers, pro rata across its
/// lenders, and write the rest off
fn default_loans(world: &mut World, firm: FirmId, period: usize, events: &mut Vec<Event>) {
    let exposures: Vec<(BankId, f64)> = world
        .banks()
        .iter()
        .filter_map(|b| b.loan_to(firm).map(|l| (b.id(), l.principal)))
        .collect();
    let outstanding: f64 = exposures.iter().map(|(_, p)| p).sum();
    if outstanding <= 0.0 {
        if let Some(f) = world.firm_mut(firm) {
            f.debt = 0.0;
        }
        return;
    }

    let available = world.firm(firm).map_or(0.0, |f| f.cash.max(0.0));
    let recovery = available.min(outstanding);

    for (bank_id, principal) in exposures {
        let recovered = recovery * principal / outstanding;
        if recovered > 0.0 {
            world.bank_receives(bank_id, Account::Firm(firm), recovered);
        }
        let written_off = principal - recovered;
        if let Some(bank) = world.bank_mut(bank_id) {
            bank.remove_loan(firm);
            bank.flows.write_offs += written_off;
        }
        events.push(Event::LoanDefault {
            period,
            bank: bank_id,
            firm,
            recovered,
            written_off,
        });
    }

    if let Some(f) = world.firm_mut(firm) {
        f.debt = 0.0;
    }
}

/// Spawn new firms modelled on randomly chosen incumbents.
/// Returns the number of entrants.
pub(crate) fn enter(
    world: &mut World,
    config: &ModelConfig,
    period: usize,
    events: &mut Vec<Event>,
) -> usize {
    let live = world.live_firm_ids();
    if live.is_empty() || config.firm.entry_rate <= 0.0 {
        return 0;
    }

    let mut rng = RngManager::substream(
        config.simulation.seed,
        StreamKey::System,
        period,
        Phase::ExitEntryRecord.tag(),
    );
    let entrants = rng.binomial(live.len(), config.firm.entry_rate);
    let price = world.mean_price();
    let sector_wages = world.stats().sector_wages.clone();
    let bank_count = world.banks().len();
    let ratio = config.firm.entrant_size_ratio;

    for _ in 0..entrants {
        let template_id = live[rng.index(live.len())];
        let Some(template) = world.firm(template_id) else {
            continue;
        };
        let wage = match sector_wages.get(template.sector) {
            Some(&w) if w > 0.0 => w,
            _ => template.wage,
        };
        let sample = FirmSample {
            sector: template.sector,
            region: template.region,
            capital: template.capital * ratio,
            cash: 0.0,
            debt: 0.0,
            inventory: 0.0,
            wage,
            productivity: template.productivity,
            expected_demand: template.expected_demand * ratio,
            revenue: 0.0,
        };
        let labour_coefficient = template.labour_coefficient;

        let id = FirmId(world.firms().len());
        let mut firm = Firm::from_sample(id, &sample, house_bank(id.index(), bank_count), config, period);
        firm.labour_coefficient = labour_coefficient;
        if let Some(p) = price {
            firm.set_price(p);
        }
        world.push_firm(firm);

        debug!(period, firm = %id, template = %template_id, "firm entry");
        events.push(Event::FirmEntry {
            period,
            firm: id,
            template: template_id,
        });
    }
    entrants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::HouseholdId;
    use crate::population::{build_world, synthesize};

    fn world(config: &ModelConfig) -> World {
        build_world(config, &synthesize(config)).unwrap()
    }

    /// Drain the firm's account into an overdraft and zero its real assets
    fn make_insolvent(world: &mut World, id: FirmId) {
        let cash = world.firm(id).unwrap().cash();
        world.transfer(Account::Firm(id), Account::Household(HouseholdId(0)), cash + 1.0);
        let firm = world.firm_mut(id).unwrap();
        firm.capital = 0.0;
        firm.inventory = 0.0;
    }

    fn config() -> ModelConfig {
        let mut config = ModelConfig::default();
        config.population.firms = 6;
        config.population.households = 30;
        config.population.banks = 2;
        config
    }

    #[test]
    fn test_exit_releases_workers_and_clears_debt() {
        let mut config = config();
        config.firm.insolvency_threshold = 1;
        let mut world = world(&config);
        let target = FirmId(2);
        make_insolvent(&mut world, target);
        let debt_before = world.debt_of(target);
        assert!(debt_before > 0.0);

        let mut events = Vec::new();
        let exits = exit(&mut world, &config, 1, &mut events);

        assert_eq!(exits, 1);
        let firm = world.firm(target).unwrap();
        assert!(!firm.is_alive());
        assert!(firm.employees().is_empty());
        assert_eq!(firm.debt(), 0.0);
        assert_eq!(firm.cash(), 0.0);
        assert_eq!(world.debt_of(target), 0.0);
        assert!(world.households().iter().all(|h| h.employer() != Some(target)));
        assert!(world.employment_consistent());
        assert!(events.iter().any(|e| matches!(e, Event::FirmExit { firm, .. } if *firm == target)));
    }

    #[test]
    fn test_exit_preserves_net_worth_identity() {
        let mut config = config();
        config.firm.insolvency_threshold = 1;
        let mut world = world(&config);
        make_insolvent(&mut world, FirmId(0));

        exit(&mut world, &config, 1, &mut Vec::new());
        world.refresh_bank_positions();

        let balances = world.sector_balances();
        assert!(balances.total().abs() < 1e-6 * balances.scale());
    }

    #[test]
    fn test_counter_below_threshold_keeps_firm() {
        let mut config = config();
        config.firm.insolvency_threshold = 3;
        let mut world = world(&config);
        make_insolvent(&mut world, FirmId(1));

        assert_eq!(exit(&mut world, &config, 1, &mut Vec::new()), 0);
        assert_eq!(exit(&mut world, &config, 2, &mut Vec::new()), 0);
        assert_eq!(world.firm(FirmId(1)).unwrap().insolvency_counter(), 2);
        assert_eq!(exit(&mut world, &config, 3, &mut Vec::new()), 1);
    }

    #[test]
    fn test_entrants_start_with_empty_balance_sheet() {
        let mut config = config();
        config.firm.entry_rate = 1.0;
        let mut world = world(&config);
        let before = world.firms().len();

        let mut events = Vec::new();
        let entrants = enter(&mut world, &config, 4, &mut events);

        assert_eq!(entrants, before);
        assert_eq!(world.firms().len(), 2 * before);
        for firm in &world.firms()[before..] {
            assert_eq!(firm.born(), 4);
            assert_eq!(firm.cash(), 0.0);
            assert_eq!(firm.debt(), 0.0);
            assert!(firm.employees().is_empty());
            assert!(firm.is_alive());
        }
        assert_eq!(events.len(), entrants);
    }

    #[test]
    fn test_no_entry_without_incumbents() {
        let mut config = config();
        config.population.firms = 0;
        config.firm.entry_rate = 1.0;
        let mut world = world(&config);
        assert_eq!(enter(&mut world, &config, 1, &mut Vec::new()), 0);
    }
}

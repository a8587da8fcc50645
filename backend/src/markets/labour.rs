//! Labour market
//!
//! One clearing call runs, in order:
//!
//! 1. Exogenous separations, one draw per employed household
//! 2. Layoffs where a firm employs more than its labour demand (the
//!    highest household ids go first)
//! 3. Search: every unemployed household samples vacancy slots from its
//!    own region without replacement
//! 4. Matching: firms in ascending id order review a shuffled sample of
//!    their applicants and fill vacancies with the acceptable applicant
//!    whose reservation wage is closest to the offer
//! 5. Seekers left unmatched lower their reservation wage
//!
//! # Critical Invariants
//!
//! 1. A household ends the call with at most one employer
//! 2. Nobody is hired below their reservation wage
//! 3. Every draw comes from the household's or firm's own substream, so
//!    the outcome does not depend on iteration interleaving

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ModelConfig;
use crate::core::phase::Phase;
use crate::models::event::Event;
use crate::models::ids::{FirmId, HouseholdId};
use crate::models::state::World;
use crate::rng::RngManager;

/// One firm's posting, as seen by seekers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vacancy {
    pub firm: FirmId,
    pub region: usize,
    pub slots: usize,
    pub wage_offer: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seeker {
    pub household: HouseholdId,
    pub region: usize,
    pub reservation_wage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub firm: FirmId,
    pub household: HouseholdId,
    pub wage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabourOutcome {
    pub separations: usize,
    pub layoffs: usize,
    pub matches: Vec<Match>,
    /// Seekers who searched and were not hired
    pub unmatched: Vec<HouseholdId>,
    /// No live firms, or no households
    pub starved: bool,
}

pub struct LabourMarket<'a> {
    config: &'a ModelConfig,
    seed: u64,
    period: usize,
}

impl<'a> LabourMarket<'a> {
    pub fn new(config: &'a ModelConfig, period: usize) -> Self {
        Self {
            config,
            seed: config.simulation.seed,
            period,
        }
    }

    fn household_rng(&self, household: HouseholdId, search: bool) -> RngManager {
        let phase = Phase::LabourMarket;
        let tag = if search { phase.secondary_tag() } else { phase.tag() };
        RngManager::substream(self.seed, household, self.period, tag)
    }

    /// Run separations, layoffs, search, matching and reservation-wage
    /// decay against the world
    pub fn clear(&self, world: &mut World, events: &mut Vec<Event>) -> LabourOutcome {
        let mut outcome = LabourOutcome {
            starved: world.live_firm_count() == 0 || world.households().is_empty(),
            ..LabourOutcome::default()
        };

        outcome.separations = self.separate(world, events);
        outcome.layoffs = self.lay_off(world, events);

        for firm in world.firms_mut() {
            firm.vacancies = if firm.alive {
                firm.labour_demand.saturating_sub(firm.employees.len())
            } else {
                0
            };
        }

        let vacancies: Vec<Vacancy> = world
            .firms()
            .iter()
            .filter(|f| f.alive && f.vacancies > 0)
            .map(|f| Vacancy {
                firm: f.id,
                region: f.region,
                slots: f.vacancies,
                wage_offer: f.wage,
            })
            .collect();
        let seekers: Vec<Seeker> = world
            .households()
            .iter()
            .filter(|h| h.employer.is_none())
            .map(|h| Seeker {
                household: h.id,
                region: h.region,
                reservation_wage: h.reservation_wage,
            })
            .collect();

        let matches = self.match_seekers(&vacancies, &seekers);
        for m in &matches {
            world.hire(m.firm, m.household, m.wage);
            if let Some(firm) = world.firm_mut(m.firm) {
                firm.vacancies = firm.vacancies.saturating_sub(1);
            }
            events.push(Event::Hired {
                period: self.period,
                firm: m.firm,
                household: m.household,
                wage: m.wage,
            });
        }

        let floor = self.config.household.reservation_wage_floor * world.stats().average_wage;
        let decay = self.config.household.reservation_wage_decay;
        for seeker in &seekers {
            if let Some(household) = world.household_mut(seeker.household) {
                if household.employer.is_none() {
                    household.lower_reservation_wage(decay, floor);
                    outcome.unmatched.push(seeker.household);
                }
            }
        }

        outcome.matches = matches;
        outcome
    }

    fn separate(&self, world: &mut World, events: &mut Vec<Event>) -> usize {
        let rate = self.config.markets.separation_rate;
        if rate <= 0.0 {
            return 0;
        }
        let employed: Vec<HouseholdId> = world
            .households()
            .iter()
            .filter(|h| h.employer.is_some())
            .map(|h| h.id)
            .collect();

        let mut count = 0;
        for household in employed {
            let mut rng = self.household_rng(household, false);
            if rng.chance(rate) {
                if let Some(firm) = world.release(household) {
                    events.push(Event::Separated {
                        period: self.period,
                        firm,
                        household,
                    });
                    count += 1;
                }
            }
        }
        count
    }

    fn lay_off(&self, world: &mut World, events: &mut Vec<Event>) -> usize {
        let mut count = 0;
        for firm_id in world.live_firm_ids() {
            loop {
                let next = match world.firm(firm_id) {
                    Some(f) if f.employees.len() > f.labour_demand => f.employees.last().copied(),
                    _ => None,
                };
                let Some(household) = next else { break };
                world.release(household);
                events.push(Event::LaidOff {
                    period: self.period,
                    firm: firm_id,
                    household,
                });
                count += 1;
            }
        }
        count
    }

    /// Search and matching on a snapshot of vacancies and seekers.
    ///
    /// `vacancies` and `seekers` are expected in ascending id order.
    pub fn match_seekers(&self, vacancies: &[Vacancy], seekers: &[Seeker]) -> Vec<Match> {
        let search_size = self.config.household.job_search_sample_size;
        let review_size = self.config.markets.matching_sample_size;

        // Regional slot pools: each firm appears once per open vacancy
        let mut pools: BTreeMap<usize, Vec<FirmId>> = BTreeMap::new();
        for vacancy in vacancies {
            let pool = pools.entry(vacancy.region).or_default();
            pool.extend(std::iter::repeat(vacancy.firm).take(vacancy.slots));
        }

        let mut applicants: BTreeMap<FirmId, Vec<Seeker>> = BTreeMap::new();
        for seeker in seekers {
            let Some(pool) = pools.get(&seeker.region) else { continue };
            if pool.is_empty() {
                continue;
            }
            let mut rng = self.household_rng(seeker.household, true);
            let mut targets: Vec<FirmId> = rng
                .sample_indices(pool.len(), search_size)
                .into_iter()
                .map(|i| pool[i])
                .collect();
            targets.sort();
            targets.dedup();
            for firm in targets {
                applicants.entry(firm).or_default().push(*seeker);
            }
        }

        let mut hired: BTreeSet<HouseholdId> = BTreeSet::new();
        let mut matches = Vec::new();

        for vacancy in vacancies {
            let Some(pool) = applicants.get_mut(&vacancy.firm) else { continue };
            if vacancy.wage_offer <= 0.0 {
                continue;
            }
            if pool.len() > review_size {
                let mut rng = RngManager::substream(
                    self.seed,
                    vacancy.firm,
                    self.period,
                    Phase::LabourMarket.tag(),
                );
                rng.shuffle(pool);
                pool.truncate(review_size);
            }

            for _ in 0..vacancy.slots {
                let best = pool
                    .iter()
                    .filter(|s| !hired.contains(&s.household))
                    .map(|s| (s.reservation_wage / vacancy.wage_offer, s.household))
                    .filter(|(ratio, _)| *ratio <= 1.0)
                    .fold(None::<(f64, HouseholdId)>, |best, (ratio, id)| match best {
                        Some((r, b)) if r > ratio || (r == ratio && b < id) => Some((r, b)),
                        _ => Some((ratio, id)),
                    });
                let Some((_, household)) = best else { break };
                hired.insert(household);
                matches.push(Match {
                    firm: vacancy.firm,
                    household,
                    wage: vacancy.wage_offer,
                });
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        let mut config = ModelConfig::default();
        config.household.job_search_sample_size = 10;
        config.markets.matching_sample_size = 10;
        config
    }

    fn seeker(id: usize, reservation_wage: f64) -> Seeker {
        Seeker {
            household: HouseholdId(id),
            region: 0,
            reservation_wage,
        }
    }

    #[test]
    fn test_prefers_reservation_closest_to_offer() {
        let config = config();
        let market = LabourMarket::new(&config, 1);
        let vacancies = [Vacancy {
            firm: FirmId(0),
            region: 0,
            slots: 1,
            wage_offer: 100.0,
        }];
        let seekers = [seeker(0, 50.0), seeker(1, 95.0), seeker(2, 120.0)];
        let matches = market.match_seekers(&vacancies, &seekers);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].household, HouseholdId(1));
        assert_eq!(matches[0].wage, 100.0);
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let config = config();
        let market = LabourMarket::new(&config, 1);
        let vacancies = [Vacancy {
            firm: FirmId(0),
            region: 0,
            slots: 1,
            wage_offer: 100.0,
        }];
        let seekers = [seeker(3, 80.0), seeker(1, 80.0)];
        let matches = market.match_seekers(&vacancies, &seekers);
        assert_eq!(matches[0].household, HouseholdId(1));
    }

    #[test]
    fn test_nobody_hired_above_offer() {
        let config = config();
        let market = LabourMarket::new(&config, 1);
        let vacancies = [Vacancy {
            firm: FirmId(0),
            region: 0,
            slots: 3,
            wage_offer: 100.0,
        }];
        let seekers = [seeker(0, 101.0), seeker(1, 200.0)];
        assert!(market.match_seekers(&vacancies, &seekers).is_empty());
    }

    #[test]
    fn test_search_is_regional() {
        let config = config();
        let market = LabourMarket::new(&config, 1);
        let vacancies = [Vacancy {
            firm: FirmId(0),
            region: 1,
            slots: 1,
            wage_offer: 100.0,
        }];
        assert!(market.match_seekers(&vacancies, &[seeker(0, 10.0)]).is_empty());
    }

    #[test]
    fn test_household_takes_at_most_one_job() {
        let config = config();
        let market = LabourMarket::new(&config, 1);
        let vacancies = [
            Vacancy { firm: FirmId(0), region: 0, slots: 2, wage_offer: 100.0 },
            Vacancy { firm: FirmId(1), region: 0, slots: 2, wage_offer: 100.0 },
        ];
        let matches = market.match_seekers(&vacancies, &[seeker(0, 10.0)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].firm, FirmId(0));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let config = config();
        let vacancies: Vec<Vacancy> = (0..5)
            .map(|i| Vacancy { firm: FirmId(i), region: 0, slots: 2, wage_offer: 100.0 })
            .collect();
        let seekers: Vec<Seeker> = (0..40).map(|i| seeker(i, 50.0 + i as f64)).collect();
        let a = LabourMarket::new(&config, 3).match_seekers(&vacancies, &seekers);
        let b = LabourMarket::new(&config, 3).match_seekers(&vacancies, &seekers);
        assert_eq!(a, b);
        assert!(a.len() <= 10);
    }
}

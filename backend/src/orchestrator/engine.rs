//! Simulation engine - the period loop
//!
//! [`Simulation`] owns the configuration, the World, the Recorder and the
//! event log, and advances them one period at a time. Each period runs on
//! a clone of the World; the clone replaces the committed World only after
//! all thirteen phases succeed, so a failed step leaves the simulation
//! exactly as it was before the call.
//!
//! # Critical Invariants
//!
//! 1. **Determinism**: same config and population, same records, for any
//!    worker count
//! 2. **Atomic periods**: records and events are appended only for fully
//!    committed periods
//! 3. **No silent failure**: configuration, population and numeric errors
//!    are returned, never absorbed
//!
//! # Example
//!
//! ```rust
//! use macro_abm_core_rs::{ModelConfig, Simulation};
//!
//! let mut config = ModelConfig::default();
//! config.simulation.periods = 4;
//! config.population.firms = 5;
//! config.population.households = 25;
//! config.population.banks = 2;
//!
//! let mut sim = Simulation::new(config).unwrap();
//! let record = sim.step().unwrap();
//! assert_eq!(record.period, 1);
//! assert_eq!(sim.current_period(), 1);
//! ```

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

use super::phases::PeriodRun;
use crate::config::{ConfigError, ModelConfig};
use crate::core::phase::Phase;
use crate::core::time::PeriodClock;
use crate::markets::Market;
use crate::models::agent::{Agent, AgentSnapshot};
use crate::models::event::EventLog;
use crate::models::state::World;
use crate::parallel::Executor;
use crate::population::{build_world, synthesize, InitialPopulation, PopulationError};
use crate::recorder::{MacroRecord, Recorder, StockFlowCheck};

// ============================================================================
// Errors
// ============================================================================

/// Errors that stop a run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Population(#[from] PopulationError),

    #[error("numeric instability in period {period}, phase {phase}: {entity} {quantity} = {value}")]
    NumericInstability {
        period: usize,
        phase: Phase,
        entity: String,
        quantity: &'static str,
        value: f64,
    },

    #[error("{market} market starved in period {period}")]
    MarketStarvation { period: usize, market: Market },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("checkpoint was taken under config {expected}, restore supplied {actual}")]
    CheckpointMismatch { expected: String, actual: String },

    #[error("could not build worker pool: {0}")]
    ThreadPool(String),
}

/// A run that stopped early, with everything committed before the failure
#[derive(Debug, Clone, PartialEq, Error)]
#[error("run halted after {} committed periods: {error}", .records.len())]
pub struct RunFailure {
    pub records: Vec<MacroRecord>,
    pub error: SimulationError,
}

/// Exogenous perturbation applied between periods
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shock {
    /// Multiply every live firm's posted price
    PriceLevel(f64),
    /// Multiply every live firm's productivity
    Productivity(f64),
}

/// Records plus end-of-run agent state
#[derive(Debug, Clone, PartialEq)]
pub struct MicroRun {
    pub records: Vec<MacroRecord>,
    pub agents: Vec<AgentSnapshot>,
    pub event_log: EventLog,
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) config: ModelConfig,
    pub(crate) clock: PeriodClock,
    pub(crate) world: World,
    pub(crate) recorder: Recorder,
    pub(crate) event_log: EventLog,
    executor: Executor,
    last_check: Option<StockFlowCheck>,
}

impl Simulation {
    /// Validate the config, synthesize a population and build the World
    pub fn new(config: ModelConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let population = synthesize(&config);
        Self::with_population(config, &population)
    }

    /// Start from externally supplied initial samples
    pub fn with_population(
        config: ModelConfig,
        population: &InitialPopulation,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let world = build_world(&config, population)?;
        Self::from_parts(config, world, Recorder::new(), EventLog::new())
    }

    pub(crate) fn from_parts(
        config: ModelConfig,
        world: World,
        recorder: Recorder,
        event_log: EventLog,
    ) -> Result<Self, SimulationError> {
        let executor =
            Executor::new(config.simulation.parallel_workers).map_err(SimulationError::ThreadPool)?;
        let mut clock = PeriodClock::new(config.simulation.periods, config.simulation.periods_per_year);
        for _ in 0..recorder.len() {
            clock.advance();
        }
        info!(
            firms = world.firms().len(),
            households = world.households().len(),
            banks = world.banks().len(),
            periods = config.simulation.periods,
            seed = config.simulation.seed,
            "simulation initialised"
        );
        Ok(Self {
            config,
            clock,
            world,
            recorder,
            event_log,
            executor,
            last_check: None,
        })
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Execute one period
    ///
    /// On success the period is committed and its record returned. On
    /// error nothing is committed: World, records, events and clock are
    /// left as they were.
    pub fn step(&mut self) -> Result<MacroRecord, SimulationError> {
        let period = self.clock.next_period();
        let span = info_span!("period", period);
        let _guard = span.enter();

        let opening_money = self.world.money_stock();
        let run = PeriodRun::new(&self.config, &self.executor, period, self.world.clone());
        let output = match run.execute() {
            Ok(output) => output,
            Err(e) => {
                error!(period, error = %e, "period aborted");
                return Err(e);
            }
        };

        let check = StockFlowCheck::measure(period, &output.world, opening_money);
        if !check.is_consistent(1e-6) {
            warn!(
                period,
                residual = check.residual,
                relative = check.relative_residual(),
                "stock-flow residual above tolerance"
            );
        }

        self.world = output.world;
        for event in output.events {
            self.event_log.log(event);
        }
        self.recorder.append(output.record.clone());
        self.last_check = Some(check);
        self.clock.advance();

        info!(
            period,
            gdp = output.record.gdp,
            unemployment = output.record.unemployment_rate,
            inflation = output.record.inflation,
            policy_rate = output.record.policy_rate,
            live_firms = output.record.live_firms,
            "period committed"
        );
        Ok(output.record)
    }

    /// Step until the configured number of periods has been committed
    pub fn run_to_end(&mut self) -> Result<(), SimulationError> {
        while !self.clock.is_finished() {
            self.step()?;
        }
        Ok(())
    }

    // ========================================================================
    // Between-period controls
    // ========================================================================

    /// Merge a partial JSON document into the live config
    ///
    /// The merged config is validated before it takes effect; on error the
    /// simulation keeps running under the old one.
    pub fn apply_overrides(&mut self, overrides: &Value) -> Result<(), SimulationError> {
        let config = self.config.with_overrides(overrides)?;
        if config.simulation.parallel_workers != self.config.simulation.parallel_workers {
            self.executor = Executor::new(config.simulation.parallel_workers)
                .map_err(SimulationError::ThreadPool)?;
        }
        if config.simulation.periods != self.clock.total_periods()
            || config.simulation.periods_per_year != self.clock.periods_per_year()
        {
            let mut clock =
                PeriodClock::new(config.simulation.periods, config.simulation.periods_per_year);
            for _ in 0..self.clock.current_period() {
                clock.advance();
            }
            self.clock = clock;
        }
        info!(period = self.clock.current_period(), %overrides, "config overrides applied");
        self.config = config;
        Ok(())
    }

    pub fn apply_shock(&mut self, shock: Shock) {
        info!(period = self.clock.current_period(), ?shock, "shock applied");
        for firm in self.world.firms_mut().iter_mut().filter(|f| f.alive) {
            match shock {
                Shock::PriceLevel(factor) => firm.set_price(firm.price * factor),
                Shock::Productivity(factor) => firm.scale_productivity(factor),
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for scenario set-up and tests
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn records(&self) -> &[MacroRecord] {
        self.recorder.records()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn current_period(&self) -> usize {
        self.clock.current_period()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Stock-flow check of the last committed period
    pub fn last_stock_flow_check(&self) -> Option<&StockFlowCheck> {
        self.last_check.as_ref()
    }

    /// Snapshot of every agent: firms, households, banks, central bank,
    /// government
    pub fn agent_snapshots(&self) -> Vec<AgentSnapshot> {
        let w = &self.world;
        w.firms()
            .iter()
            .map(Agent::snapshot)
            .chain(w.households().iter().map(Agent::snapshot))
            .chain(w.banks().iter().map(Agent::snapshot))
            .chain(std::iter::once(w.central_bank().snapshot()))
            .chain(std::iter::once(w.government().snapshot()))
            .collect()
    }

    pub fn into_records(self) -> Vec<MacroRecord> {
        self.recorder.into_records()
    }
}

// ============================================================================
// One-shot runs
// ============================================================================

fn run_simulation(mut sim: Simulation) -> Result<Simulation, RunFailure> {
    match sim.run_to_end() {
        Ok(()) => Ok(sim),
        Err(error) => Err(RunFailure {
            records: sim.into_records(),
            error,
        }),
    }
}

fn setup_failure(error: SimulationError) -> RunFailure {
    RunFailure {
        records: Vec::new(),
        error,
    }
}

/// Run the configured number of periods from a synthesized population
pub fn run(config: ModelConfig) -> Result<Vec<MacroRecord>, RunFailure> {
    let sim = Simulation::new(config).map_err(setup_failure)?;
    run_simulation(sim).map(Simulation::into_records)
}

/// Run the configured number of periods from the given population
pub fn run_with_population(
    config: ModelConfig,
    population: &InitialPopulation,
) -> Result<Vec<MacroRecord>, RunFailure> {
    let sim = Simulation::with_population(config, population).map_err(setup_failure)?;
    run_simulation(sim).map(Simulation::into_records)
}

/// Like [`run`], also returning the final agent states and the event log
pub fn run_with_micro(config: ModelConfig) -> Result<MicroRun, RunFailure> {
    let sim = Simulation::new(config).map_err(setup_failure)?;
    let sim = run_simulation(sim)?;
    let agents = sim.agent_snapshots();
    Ok(MicroRun {
        agents,
        event_log: sim.event_log.clone(),
        records: sim.into_records(),
    })
}

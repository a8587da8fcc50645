//! Macro ABM Core - Rust Engine
//!
//! Discrete-time agent-based macroeconomic simulator with deterministic
//! execution. Firms, households, banks, a central bank and a government
//! interact through goods, labour and credit markets, one period at a time.
//!
//! # Architecture
//!
//! - **core**: Period clock and phase ordering
//! - **config**: Parameter bundle, defaults and validation
//! - **models**: Agent types, the World arena, events
//! - **markets**: Goods, labour and credit clearing
//! - **population**: Initial samples and World construction
//! - **orchestrator**: The period loop, checkpoints
//! - **recorder**: Macro records, accounting checks, calibration scoring
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Sector financial net worth sums to zero after every period
//! 2. All randomness is deterministic (seeded substreams)
//! 3. A failed period commits nothing

// Module declarations
pub mod config;
pub mod core;
pub mod markets;
pub mod models;
pub mod orchestrator;
pub mod parallel;
pub mod population;
pub mod recorder;
pub mod rng;

// Re-exports for convenience
pub use config::{ConfigError, ModelConfig};
pub use crate::core::phase::Phase;
pub use crate::core::time::PeriodClock;
pub use markets::Market;
pub use models::{
    agent::{Agent, AgentSnapshot},
    event::{Event, EventLog},
    state::World,
};
pub use orchestrator::{
    run, run_with_micro, run_with_population, MicroRun, RunFailure, Shock, Simulation,
    SimulationError,
};
pub use population::{InitialPopulation, PopulationError};
pub use recorder::{CalibrationReport, MacroRecord, Recorder, StockFlowCheck, SummaryStatistics, Target};
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn macro_abm_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PySimulation>()?;
    m.add_function(wrap_pyfunction!(ffi::orchestrator::run_simulation, m)?)?;
    Ok(())
}

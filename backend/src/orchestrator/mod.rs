//! Orchestrator - the period loop
//!
//! Runs the thirteen phases of each period over a working copy of the
//! World and commits the result atomically.
//!
//! See `engine.rs` for the public entry points and `phases.rs` for what
//! each phase does.

pub mod checkpoint;
pub mod engine;
mod lifecycle;
mod phases;


pub use checkpoint::{compute_config_hash, SimulationCheckpoint};
pub use engine::{
    run, run_with_micro, run_with_population, MicroRun, RunFailure, Shock, Simulation,
    SimulationError,
};

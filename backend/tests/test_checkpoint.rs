//! Checkpoint save and restore

use macro_abm_core_rs::orchestrator::{compute_config_hash, SimulationCheckpoint};
use macro_abm_core_rs::{ModelConfig, Simulation, SimulationError};

fn config() -> ModelConfig {
    let mut config = ModelConfig::default();
    config.simulation.periods = 8;
    config.simulation.seed = 99;
    config.population.firms = 8;
    config.population.households = 40;
    config.population.banks = 2;
    config
}

#[test]
fn test_restored_run_matches_uninterrupted_run() {
    let mut reference = Simulation::new(config()).unwrap();
    reference.run_to_end().unwrap();

    let mut first_half = Simulation::new(config()).unwrap();
    for _ in 0..4 {
        first_half.step().unwrap();
    }
    let json = first_half.checkpoint().unwrap();
    drop(first_half);

    let mut resumed = Simulation::restore(&json, config()).unwrap();
    assert_eq!(resumed.current_period(), 4);
    assert_eq!(resumed.records().len(), 4);
    resumed.run_to_end().unwrap();

    assert_eq!(resumed.records(), reference.records());
    assert_eq!(resumed.world(), reference.world());
    assert_eq!(resumed.event_log(), reference.event_log());
}

#[test]
fn test_checkpoint_carries_config_hash() {
    let mut sim = Simulation::new(config()).unwrap();
    sim.step().unwrap();
    let json = sim.checkpoint().unwrap();

    let snapshot: SimulationCheckpoint = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot.period, 1);
    assert_eq!(snapshot.config_hash, compute_config_hash(&config()).unwrap());
    assert_eq!(snapshot.recorder.len(), 1);
}

#[test]
fn test_restore_refuses_different_config() {
    let mut sim = Simulation::new(config()).unwrap();
    sim.step().unwrap();
    let json = sim.checkpoint().unwrap();

    let mut other = config();
    other.simulation.seed = 100;
    match Simulation::restore(&json, other.clone()) {
        Err(SimulationError::CheckpointMismatch { expected, actual }) => {
            assert_eq!(expected, compute_config_hash(&config()).unwrap());
            assert_eq!(actual, compute_config_hash(&other).unwrap());
        }
        other => panic!("expected a checkpoint mismatch, got {other:?}"),
    }
}

#[test]
fn test_restore_rejects_inconsistent_period() {
    let mut sim = Simulation::new(config()).unwrap();
    sim.step().unwrap();
    let json = sim.checkpoint().unwrap();

    let mut snapshot: SimulationCheckpoint = serde_json::from_str(&json).unwrap();
    snapshot.period = 3;
    let tampered = serde_json::to_string(&snapshot).unwrap();
    assert!(matches!(
        Simulation::restore(&tampered, config()),
        Err(SimulationError::Serialization(_))
    ));
}

#[test]
fn test_checkpoint_before_first_period() {
    let sim = Simulation::new(config()).unwrap();
    let json = sim.checkpoint().unwrap();
    let restored = Simulation::restore(&json, config()).unwrap();
    assert_eq!(restored.current_period(), 0);
    assert!(restored.records().is_empty());
    assert_eq!(restored.world(), sim.world());
}

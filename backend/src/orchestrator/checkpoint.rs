//! Checkpoint - save and restore a simulation between periods
//!
//! A checkpoint is a JSON document holding the World, the records and the
//! event log of a simulation, plus a hash of the config it was taken
//! under. Restoring with a config that hashes differently is refused.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored simulation produces the same subsequent
//!   records as an uninterrupted run would have
//! - **Config Matching**: state can only be loaded with a matching config

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::engine::{Simulation, SimulationError};
use crate::config::ModelConfig;
use crate::models::event::EventLog;
use crate::models::state::World;
use crate::recorder::Recorder;

/// Complete simulation state at a period boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationCheckpoint {
    /// Last committed period
    pub period: usize,

    /// SHA256 hash of the config (for validation)
    pub config_hash: String,

    pub world: World,
    pub recorder: Recorder,
    pub event_log: EventLog,
}

impl Simulation {
    /// Serialize the committed state
    pub fn checkpoint(&self) -> Result<String, SimulationError> {
        let snapshot = SimulationCheckpoint {
            period: self.clock.current_period(),
            config_hash: compute_config_hash(&self.config)?,
            world: self.world.clone(),
            recorder: self.recorder.clone(),
            event_log: self.event_log.clone(),
        };
        serde_json::to_string(&snapshot)
            .map_err(|e| SimulationError::Serialization(format!("checkpoint: {}", e)))
    }

    /// Rebuild a simulation from a checkpoint taken under `config`
    pub fn restore(json: &str, config: ModelConfig) -> Result<Self, SimulationError> {
        let snapshot: SimulationCheckpoint = serde_json::from_str(json)
            .map_err(|e| SimulationError::Serialization(format!("checkpoint: {}", e)))?;

        let actual = compute_config_hash(&config)?;
        if actual != snapshot.config_hash {
            return Err(SimulationError::CheckpointMismatch {
                expected: snapshot.config_hash,
                actual,
            });
        }
        if snapshot.recorder.len() != snapshot.period {
            return Err(SimulationError::Serialization(format!(
                "checkpoint at period {} carries {} records",
                snapshot.period,
                snapshot.recorder.len()
            )));
        }
        config.validate()?;

        info!(period = snapshot.period, "restoring checkpoint");
        Simulation::from_parts(config, snapshot.world, snapshot.recorder, snapshot.event_log)
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute a deterministic SHA256 hash of any serializable config
///
/// Object keys are sorted before hashing so the result does not depend on
/// field order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::Serialization(format!("config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::Serialization(format!("config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

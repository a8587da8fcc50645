//! PyO3 wrapper for Simulation
//!
//! This module provides the Python interface to the Rust engine.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{parse_config, record_to_py, records_to_py, run_failure_to_py_err, to_py_err};
use crate::orchestrator::{run, Simulation as RustSimulation};
use crate::recorder::{CalibrationReport, Target};

/// Python wrapper for the Rust Simulation
///
/// # Example (from Python)
///
/// ```python
/// from macro_abm_core_rs import Simulation
///
/// sim = Simulation('{"simulation": {"periods": 40, "seed": 7}}')
/// record = sim.step()
/// print(f"Period {record['period']}: GDP {record['gdp']:.0f}")
/// ```
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: RustSimulation,
}

#[pymethods]
impl PySimulation {
    /// Create a simulation from a JSON config (defaults when omitted)
    ///
    /// Raises ValueError on an invalid config or population.
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let inner = RustSimulation::new(config).map_err(to_py_err)?;
        Ok(PySimulation { inner })
    }

    /// Rebuild a simulation from a checkpoint and the config it was taken under
    #[staticmethod]
    #[pyo3(signature = (checkpoint, config_json=None))]
    fn restore(checkpoint: &str, config_json: Option<&str>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let inner = RustSimulation::restore(checkpoint, config).map_err(to_py_err)?;
        Ok(PySimulation { inner })
    }

    /// Execute one period and return its record
    fn step<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let record = self.inner.step().map_err(to_py_err)?;
        record_to_py(py, &record)
    }

    /// Step to the configured end and return every record
    fn run<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        self.inner.run_to_end().map_err(to_py_err)?;
        records_to_py(py, self.inner.records())
    }

    fn records<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        records_to_py(py, self.inner.records())
    }

    fn current_period(&self) -> usize {
        self.inner.current_period()
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Merge a partial JSON config into the running simulation
    fn apply_overrides(&mut self, overrides_json: &str) -> PyResult<()> {
        let overrides: serde_json::Value = serde_json::from_str(overrides_json)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        self.inner.apply_overrides(&overrides).map_err(to_py_err)
    }

    fn checkpoint(&self) -> PyResult<String> {
        self.inner.checkpoint().map_err(to_py_err)
    }

    /// Calibration table against the default targets
    fn calibration_summary(&self) -> String {
        let config = self.inner.config();
        CalibrationReport::evaluate(
            self.inner.records(),
            &Target::defaults(),
            config.simulation.warm_up_periods,
            config.simulation.periods_per_year,
        )
        .summary()
    }
}

/// Run a full simulation and return the records
///
/// On failure the raised exception carries the records committed before
/// it in its `records` attribute.
#[pyfunction]
#[pyo3(signature = (config_json=None))]
pub fn run_simulation<'py>(py: Python<'py>, config_json: Option<&str>) -> PyResult<Bound<'py, PyList>> {
    let config = parse_config(config_json)?;
    let records = run(config).map_err(|failure| run_failure_to_py_err(py, failure))?;
    records_to_py(py, &records)
}

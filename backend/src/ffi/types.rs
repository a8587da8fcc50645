//! Type conversion utilities for FFI boundary
//!
//! Converts records and errors into their Python counterparts.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::config::ModelConfig;
use crate::orchestrator::{RunFailure, SimulationError};
use crate::recorder::MacroRecord;

/// Parse an optional JSON document; `None` gives the default config
pub fn parse_config(config_json: Option<&str>) -> PyResult<ModelConfig> {
    match config_json {
        Some(json) => ModelConfig::from_json_str(json).map_err(|e| PyValueError::new_err(e.to_string())),
        None => Ok(ModelConfig::default()),
    }
}

/// Setup errors become ValueError, run-time failures RuntimeError
pub fn to_py_err(error: SimulationError) -> PyErr {
    match error {
        SimulationError::Configuration(_)
        | SimulationError::Population(_)
        | SimulationError::CheckpointMismatch { .. } => PyValueError::new_err(error.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Like [`to_py_err`], with the committed records attached to the
/// exception as `records`
pub fn run_failure_to_py_err(py: Python<'_>, failure: RunFailure) -> PyErr {
    let records = match records_to_py(py, &failure.records) {
        Ok(records) => records,
        Err(e) => return e,
    };
    let err = to_py_err(failure.error);
    if let Err(e) = err.value(py).setattr("records", records) {
        return e;
    }
    err
}

/// Convert MacroRecord to Python dict
pub fn record_to_py<'py>(py: Python<'py>, record: &MacroRecord) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);

    dict.set_item("period", record.period)?;
    dict.set_item("gdp", record.gdp)?;
    dict.set_item("real_gdp", record.real_gdp)?;
    dict.set_item("price_index", record.price_index)?;
    dict.set_item("inflation", record.inflation)?;
    dict.set_item("unemployment_rate", record.unemployment_rate)?;
    dict.set_item("average_wage", record.average_wage)?;
    dict.set_item("policy_rate", record.policy_rate)?;
    dict.set_item("government_deficit", record.government_deficit)?;
    dict.set_item("government_debt", record.government_debt)?;
    dict.set_item("total_lending", record.total_lending)?;
    dict.set_item("new_lending", record.new_lending)?;
    dict.set_item("loan_rejections", record.loan_rejections)?;
    dict.set_item("firm_bankruptcies", record.firm_bankruptcies)?;
    dict.set_item("firm_entries", record.firm_entries)?;
    dict.set_item("total_employment", record.total_employment)?;
    dict.set_item("live_firms", record.live_firms)?;
    dict.set_item("money_stock", record.money_stock)?;
    dict.set_item("stock_flow_residual", record.stock_flow_residual)?;

    Ok(dict)
}

/// Convert a record sequence to a Python list of dicts
pub fn records_to_py<'py>(py: Python<'py>, records: &[MacroRecord]) -> PyResult<Bound<'py, PyList>> {
    let list = PyList::empty(py);
    for record in records {
        list.append(record_to_py(py, record)?)?;
    }
    Ok(list)
}

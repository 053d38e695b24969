//! Python bindings.
//!
//! A run is configured with a TOML document and a parameter file. The
//! decomposition kernel is any Python callable with the signature
//!
//! ```python
//! def kernel(parameters, duration, climate, initial, litter, size_class) -> list[float]:
//!     ...
//! ```
//!
//! returning the five compartment masses at the end of the timestep.

use numpy::ToPyArray;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::ops::ControlFlow;
use std::path::PathBuf;
use yasso_core::errors::{YassoError, YassoResult};
use yasso_core::kernel::DecompositionKernel;
use yasso_core::results::OutputChannel;
use yasso_core::simulation::ProgressInfo;
use yasso_core::{FloatValue, SimulationBuilder, SimulationConfig};

/// Decomposition kernel backed by a Python callable
struct PyKernel(Py<PyAny>);

impl DecompositionKernel for PyKernel {
    fn decompose(
        &self,
        parameters: &[FloatValue],
        duration: FloatValue,
        climate: [FloatValue; 3],
        initial: [FloatValue; 5],
        input: [FloatValue; 5],
        size_class: FloatValue,
    ) -> YassoResult<[FloatValue; 5]> {
        Python::with_gil(|py| {
            let end: Vec<FloatValue> = self
                .0
                .call1(
                    py,
                    (
                        parameters.to_vec(),
                        duration,
                        climate.to_vec(),
                        initial.to_vec(),
                        input.to_vec(),
                        size_class,
                    ),
                )
                .and_then(|value| value.extract(py))
                .map_err(|e| YassoError::Kernel(e.to_string()))?;

            <[FloatValue; 5]>::try_from(end.as_slice()).map_err(|_| {
                YassoError::Kernel(format!(
                    "kernel returned {} values, expected 5",
                    end.len()
                ))
            })
        })
    }
}

fn to_py_err(error: YassoError) -> PyErr {
    match error {
        YassoError::Kernel(message) => PyRuntimeError::new_err(message),
        error => PyValueError::new_err(error.to_string()),
    }
}

fn build(
    config: &str,
    parameter_file: PathBuf,
    kernel: Py<PyAny>,
) -> PyResult<yasso_core::Simulation<PyKernel>> {
    let config = SimulationConfig::from_toml_str(config).map_err(to_py_err)?;
    let mut builder = SimulationBuilder::from_config(config);
    builder.with_parameter_file(parameter_file);
    builder.build(PyKernel(kernel)).map_err(to_py_err)
}

/// Run a simulation.
///
/// `progress` is called with `(sample, total, errors)` before each sample.
/// Returning `False` from it cancels the run.
#[pyfunction]
#[pyo3(signature = (config, parameter_file, kernel, progress=None))]
fn run_simulation<'py>(
    py: Python<'py>,
    config: &str,
    parameter_file: PathBuf,
    kernel: Py<PyAny>,
    progress: Option<Py<PyAny>>,
) -> PyResult<Bound<'py, PyDict>> {
    let simulation = build(config, parameter_file, kernel)?;

    let mut callback_error: Option<PyErr> = None;
    let output = match progress {
        Some(progress) => simulation.run_with_progress(|info: &ProgressInfo| {
            match progress
                .call1(py, (info.sample, info.total, info.errors))
                .and_then(|value| value.extract::<Option<bool>>(py))
            {
                Ok(Some(false)) => ControlFlow::Break(()),
                Ok(_) => ControlFlow::Continue(()),
                Err(e) => {
                    callback_error = Some(e);
                    ControlFlow::Break(())
                }
            }
        }),
        None => simulation.run(),
    }
    .map_err(to_py_err)?;
    if let Some(e) = callback_error {
        return Err(e);
    }

    let summary = output.summarize();
    let moments = PyDict::new_bound(py);
    for channel in OutputChannel::all() {
        moments.set_item(channel.to_string(), summary.to_array(channel).to_pyarray_bound(py))?;
    }

    let errors = PyList::empty_bound(py);
    for error in &output.sample_errors {
        errors.append((error.sample, error.timestep, error.message.as_str()))?;
    }

    let result = PyDict::new_bound(py);
    result.set_item("stock", output.raw.stock.to_array().to_pyarray_bound(py))?;
    result.set_item("change", output.raw.change.to_array().to_pyarray_bound(py))?;
    result.set_item("co2", output.raw.co2.to_array().to_pyarray_bound(py))?;
    result.set_item("summary", moments)?;
    result.set_item("completed_samples", output.completed_samples)?;
    result.set_item("cancelled", output.cancelled)?;
    result.set_item("sample_errors", errors)?;
    Ok(result)
}

/// Steady state per size class as `(size_class, mass, mass_std)` tuples
#[pyfunction]
fn steady_state(
    config: &str,
    parameter_file: PathBuf,
    kernel: Py<PyAny>,
) -> PyResult<Vec<(FloatValue, FloatValue, FloatValue)>> {
    let steady_state = build(config, parameter_file, kernel)?
        .steady_state()
        .map_err(to_py_err)?;
    Ok(steady_state
        .states
        .iter()
        .map(|(size_class, state)| (size_class.diameter(), state.mass.mean, state.mass.std))
        .collect())
}

#[pymodule]
#[pyo3(name = "_lib")]
fn yasso(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(run_simulation, m)?)?;
    m.add_function(wrap_pyfunction!(steady_state, m)?)?;
    Ok(())
}

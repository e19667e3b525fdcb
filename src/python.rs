//! Python bindings for the rotation simulator using PyO3

use crate::config::SimConfig;
use crate::simulation::{FastRng, Scenario, Simulation};
use crate::sweep::run_sweep;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn sim_error(e: crate::error::SimError) -> PyErr {
    PyErr::new::<PyRuntimeError, _>(e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PyErr::new::<PyRuntimeError, _>(format!("Failed to serialize results: {}", e)))
}

fn run_strategy(config: &SimConfig, strategy: &str, num_targets: u32, parallel: bool) -> crate::error::Result<serde_json::Value> {
    let strategy = config.strategy(strategy)?;
    let catalog = config.catalog();
    let seed = config.encounter.resolve_seed();
    let scenario = Scenario {
        strategy: &strategy,
        catalog: &catalog,
        character: config.character,
        talents: config.talents(),
        num_targets,
        duration: config.encounter.duration,
    };

    let mut sim = Simulation::new(scenario, config.encounter.iterations);
    if parallel {
        sim.run_parallel(seed)?;
    } else {
        sim.run(&mut FastRng::new(seed))?;
    }

    Ok(serde_json::json!({
        "strategy": strategy.name,
        "targets": num_targets,
        "seed": seed,
        "stats": sim.stats(),
        "breakdown": sim.best_iteration().map(|b| b.breakdown()).unwrap_or_default(),
    }))
}

/// Run one strategy for every configured target count, config given as JSON
#[pyfunction]
#[pyo3(signature = (config_json, strategy, parallel=false))]
fn simulate_json(py: Python<'_>, config_json: &str, strategy: &str, parallel: bool) -> PyResult<String> {
    let config = SimConfig::from_json(config_json)
        .map_err(|e| PyErr::new::<PyValueError, _>(format!("Invalid config JSON: {}", e)))?;

    // Release GIL during computation
    let results = py.allow_threads(|| {
        config
            .encounter
            .targets
            .iter()
            .map(|&n| run_strategy(&config, strategy, n, parallel))
            .collect::<crate::error::Result<Vec<_>>>()
    });

    to_json(&results.map_err(sim_error)?)
}

/// Talent sweep over every configured target count, config given as JSON
#[pyfunction]
#[pyo3(signature = (config_json, parallel=true))]
fn sweep_json(py: Python<'_>, config_json: &str, parallel: bool) -> PyResult<String> {
    let config = SimConfig::from_json(config_json)
        .map_err(|e| PyErr::new::<PyValueError, _>(format!("Invalid config JSON: {}", e)))?;
    let seed = config.encounter.resolve_seed();

    let results = py.allow_threads(|| {
        config
            .encounter
            .targets
            .iter()
            .map(|&n| run_sweep(&config, n, seed, parallel))
            .collect::<crate::error::Result<Vec<_>>>()
    });

    to_json(&results.map_err(sim_error)?)
}

/// Talent sweep from a YAML or JSON config file
#[pyfunction]
#[pyo3(signature = (config_path, parallel=true))]
fn sweep_from_file(py: Python<'_>, config_path: &str, parallel: bool) -> PyResult<String> {
    let config = SimConfig::from_file(config_path)
        .map_err(|e| PyErr::new::<PyIOError, _>(format!("Failed to load config: {}", e)))?;
    let seed = config.encounter.resolve_seed();

    let results = py.allow_threads(|| {
        config
            .encounter
            .targets
            .iter()
            .map(|&n| run_sweep(&config, n, seed, parallel))
            .collect::<crate::error::Result<Vec<_>>>()
    });

    to_json(&results.map_err(sim_error)?)
}

/// Get number of threads in the rayon pool
#[pyfunction]
fn get_thread_count() -> PyResult<usize> {
    Ok(rayon::current_num_threads())
}

/// Get number of available CPU cores
#[pyfunction]
fn get_available_cores() -> PyResult<usize> {
    Ok(num_cpus::get())
}

#[pymodule]
fn mw_sim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate_json, m)?)?;
    m.add_function(wrap_pyfunction!(sweep_json, m)?)?;
    m.add_function(wrap_pyfunction!(sweep_from_file, m)?)?;
    m.add_function(wrap_pyfunction!(get_thread_count, m)?)?;
    m.add_function(wrap_pyfunction!(get_available_cores, m)?)?;
    Ok(())
}

//! Config loading and simulation construction shared between sim_cli and sim_daemon.

use anyhow::{Context, Result};
use sim_core::{SimConfig, Simulation};
use std::path::Path;

/// Read, parse and validate a JSON `SimConfig`. Missing fields take their
/// defaults, so `{}` is a valid file.
pub fn load_config(path: &Path) -> Result<SimConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: SimConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(config)
}

/// `load_config` when a path is given, built-in defaults otherwise.
pub fn load_config_or_default(path: Option<&Path>) -> Result<SimConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(SimConfig::default()),
    }
}

/// Pick the run seed: an explicit override, then the config's seed, then a
/// fresh random one.
pub fn resolve_seed(config: &SimConfig, seed: Option<u64>) -> u64 {
    seed.or(config.seed).unwrap_or_else(rand::random)
}

/// Build a ready-to-step simulation. See [`resolve_seed`] for seed precedence.
pub fn build_simulation(config: SimConfig, seed: Option<u64>) -> Result<Simulation> {
    let seed = resolve_seed(&config, seed);
    Simulation::new(config, seed).context("building simulation")
}

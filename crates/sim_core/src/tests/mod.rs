use super::*;
use crate::test_fixtures::{base_config, pedal_config, seeded_sim, TEST_SEED};

mod determinism;
mod mode_switch;
mod performance;

// --- Shared test helpers ------------------------------------------------

const DT: f64 = 0.2;

/// Step `n` times at the nominal 0.2 s cadence, panicking on a fatal error.
fn run(sim: &mut Simulation, n: usize) -> Vec<TickOutput> {
    (0..n)
        .map(|i| {
            sim.step(DT)
                .unwrap_or_else(|err| panic!("tick {i} failed: {err}"))
        })
        .collect()
}

fn config_with_events(probability: f64) -> SimConfig {
    SimConfig {
        event_probability: probability,
        ..base_config()
    }
}

//! Shared test fixtures for sim_core and downstream crates.
//!
//! `base_config()` is the default config with events disabled, so physics
//! tests see no random speed or environment kicks unless they inject one.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{KinematicsVariant, SimConfig, Simulation};

pub const TEST_SEED: u64 = 42;

pub fn base_config() -> SimConfig {
    SimConfig {
        event_probability: 0.0,
        seed: Some(TEST_SEED),
        ..SimConfig::default()
    }
}

/// Base config driven by throttle/brake/steering instead of mode targets.
pub fn pedal_config() -> SimConfig {
    SimConfig {
        kinematics: KinematicsVariant::Pedal,
        ..base_config()
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(TEST_SEED)
}

pub fn seeded_sim(config: SimConfig) -> Simulation {
    Simulation::new(config, TEST_SEED).expect("test config must be valid")
}

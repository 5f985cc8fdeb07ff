//! `sim_core`: deterministic EV simulation tick.
//!
//! No IO, no network, no logging. All randomness comes from the seeded RNG
//! owned by [`Simulation`]; a tick reports what happened as [`SimEvent`]s and
//! leaves it to the caller to log or publish them.

pub mod config;
pub mod energy;
mod engine;
mod error;
pub mod events;
mod id;
pub mod kinematics;
pub mod modes;
pub mod predictor;
mod simulation;
pub mod thermal;
pub mod tires;
mod types;

pub use config::{KinematicsVariant, PredictorConfig, SimConfig, ThermalSpec, VehicleSpec};
pub use engine::{check_invariants, sanitize_dt, tick, TickEnv, MAX_TICK_DT_S};
pub use error::SimError;
pub use events::{Event, EventEffects, EventInjector, EventKind, InjectorState};
pub use id::new_vehicle_id;
pub use modes::ModeProfile;
pub use predictor::{
    build_predictor, ConsumptionFeatures, ConsumptionPredictor, HeuristicPredictor,
    LinearPredictor, ModeBaselinePredictor,
};
pub use simulation::{Simulation, TickOutput};
pub use types::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;

//! Motor and brake temperature.
//!
//! Both components relax first-order toward a load-dependent target between
//! ambient and their ceiling:
//!
//! ```text
//! T' = T + (target - T) * clamp(rate * dt, 0, 1)
//! ```
//!
//! Temperatures never drop below ambient.

use crate::config::{KinematicsVariant, SimConfig};
use crate::{ControlInput, ModeProfile, VehicleState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalUpdate {
    pub motor_temp_c: f64,
    pub brake_temp_c: f64,
    pub motor_load_pct: f64,
}

impl ThermalUpdate {
    pub fn is_finite(&self) -> bool {
        self.motor_temp_c.is_finite()
            && self.brake_temp_c.is_finite()
            && self.motor_load_pct.is_finite()
    }
}

/// Motor load in percent: a 20% floor plus shares for speed and acceleration.
pub fn motor_load_pct(speed_kmh: f64, acceleration_ms2: f64, profile: &ModeProfile) -> f64 {
    let speed_share = 40.0 * speed_kmh / profile.max_speed_kmh;
    let accel_share = 40.0 * acceleration_ms2.abs() / profile.max_acceleration_ms2;
    (20.0 + speed_share + accel_share).clamp(0.0, 100.0)
}

/// 0..1 braking intensity. The pedal variant reads the brake pedal; the
/// mode-target variant infers it from deceleration.
pub fn brake_intensity(
    variant: KinematicsVariant,
    state: &VehicleState,
    controls: &ControlInput,
    profile: &ModeProfile,
) -> f64 {
    match variant {
        KinematicsVariant::Pedal => controls.brake,
        KinematicsVariant::ModeTarget if state.acceleration_ms2 < 0.0 => {
            (-state.acceleration_ms2 / profile.max_acceleration_ms2).min(1.0)
        }
        KinematicsVariant::ModeTarget => 0.0,
    }
}

fn relax(current: f64, target: f64, rate: f64, dt: f64) -> f64 {
    current + (target - current) * (rate * dt).clamp(0.0, 1.0)
}

pub fn step(state: &VehicleState, config: &SimConfig, brake: f64, dt: f64) -> ThermalUpdate {
    let profile = state.mode.profile();
    let ambient = config.ambient_temp_c;
    let spec = &config.thermal;

    let load = motor_load_pct(state.speed_kmh, state.acceleration_ms2, profile);
    let motor_target = ambient + (spec.max_motor_temp_c - ambient) * load / 100.0;
    let motor_temp_c = relax(state.motor_temp_c, motor_target, spec.motor_rate, dt).max(ambient);

    let heat = (brake * state.speed_kmh / 100.0).clamp(0.0, 1.0);
    let brake_target = ambient + (spec.max_brake_temp_c - ambient) * heat;
    let brake_temp_c = relax(state.brake_temp_c, brake_target, spec.brake_rate, dt).max(ambient);

    ThermalUpdate {
        motor_temp_c,
        brake_temp_c,
        motor_load_pct: load,
    }
}

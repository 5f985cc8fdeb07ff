//! Longitudinal motion models.
//!
//! Two variants share one output shape:
//! - mode-target: speed is pulled toward the mode's cruising speed with
//!   Gaussian noise, road grade and wind as disturbances;
//! - pedal: throttle, brake and steering drive a force balance and a
//!   kinematic bicycle model that also tracks a 3D pose.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{KinematicsVariant, VehicleSpec};
use crate::{ControlInput, ModeProfile, Pose, Vec3, VehicleState};

/// Floor applied to dt when converting a speed change into an acceleration.
pub const MIN_DT_S: f64 = 0.1;

pub const AIR_DENSITY: f64 = 1.225;
pub const GRAVITY: f64 = 9.81;

/// Below this speed with no throttle the vehicle is considered stopped.
const STOP_SPEED_MS: f64 = 0.1;
/// Traction force is computed against at least this speed to keep it bounded
/// at standstill.
const MIN_TRACTION_SPEED_MS: f64 = 0.5;
/// Dead band around the target speed, km/h.
const TARGET_BAND_KMH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsUpdate {
    pub speed_kmh: f64,
    pub acceleration_ms2: f64,
    pub distance_delta_m: f64,
    pub pose: Option<Pose>,
}

impl KinematicsUpdate {
    pub fn is_finite(&self) -> bool {
        self.speed_kmh.is_finite()
            && self.acceleration_ms2.is_finite()
            && self.distance_delta_m.is_finite()
            && self.pose.as_ref().map_or(true, Pose::is_finite)
    }
}

/// Desired speed change (km/h per tick, before time scaling) pulling the
/// vehicle toward the mode target.
pub fn target_speed_tendency(speed_kmh: f64, profile: &ModeProfile) -> f64 {
    let gap = profile.target_speed_kmh - speed_kmh;
    if speed_kmh < profile.target_speed_kmh - TARGET_BAND_KMH {
        (0.5 * profile.max_acceleration_ms2).min(gap * 0.1)
    } else if speed_kmh > profile.target_speed_kmh + TARGET_BAND_KMH {
        (-0.3 * profile.max_acceleration_ms2).max(gap * 0.1)
    } else {
        gap * 0.05
    }
}

fn speed_noise(profile: &ModeProfile, rng: &mut impl Rng) -> f64 {
    Normal::new(0.0, profile.speed_variation / 10.0).map_or(0.0, |n| n.sample(rng))
}

/// Distance covered at `speed_kmh` over `dt` simulated seconds, in meters.
fn distance_m(speed_kmh: f64, dt: f64, time_scale: f64) -> f64 {
    speed_kmh * dt * time_scale / 3600.0 * 1000.0
}

pub fn step_mode_target(
    state: &VehicleState,
    profile: &ModeProfile,
    dt: f64,
    rng: &mut impl Rng,
) -> KinematicsUpdate {
    let road_effect = -state.road_grade_pct * 0.2;
    let wind_effect = -state.wind_speed_ms * 0.05;
    let change_kmh = (target_speed_tendency(state.speed_kmh, profile) + road_effect + wind_effect)
        * profile.time_scale
        + speed_noise(profile, rng);

    let max_a = profile.max_acceleration_ms2;
    let acceleration = (change_kmh / (3.6 * dt.max(MIN_DT_S))).clamp(-max_a, max_a);
    let speed_kmh =
        (state.speed_kmh + acceleration * 3.6 * dt).clamp(0.0, profile.max_speed_kmh);

    KinematicsUpdate {
        speed_kmh,
        acceleration_ms2: acceleration,
        distance_delta_m: distance_m(speed_kmh, dt, profile.time_scale),
        pose: None,
    }
}

/// Net longitudinal force in newtons for the given speed and controls.
pub fn longitudinal_force_n(
    v_ms: f64,
    state: &VehicleState,
    controls: &ControlInput,
    vehicle: &VehicleSpec,
) -> f64 {
    let m = vehicle.weight_kg;
    let traction = if state.battery_level_pct > 0.0 {
        vehicle.max_power_kw * controls.throttle * 1000.0 / v_ms.max(MIN_TRACTION_SPEED_MS)
    } else {
        0.0
    };
    let braking = if v_ms > 0.0 {
        m * GRAVITY * vehicle.brake_efficiency * controls.brake
    } else {
        0.0
    };
    let air_speed = v_ms + state.wind_speed_ms;
    let drag = 0.5
        * AIR_DENSITY
        * vehicle.drag_coefficient
        * vehicle.frontal_area_m2
        * air_speed
        * air_speed.abs();
    let rolling = if v_ms > 0.0 {
        vehicle.rolling_resistance * m * GRAVITY
    } else {
        0.0
    };
    let slope = (state.road_grade_pct / 100.0).atan();
    let grade = m * GRAVITY * slope.sin();

    traction - braking - drag - rolling - grade
}

pub fn step_pedal(
    state: &VehicleState,
    controls: &ControlInput,
    profile: &ModeProfile,
    vehicle: &VehicleSpec,
    dt: f64,
) -> KinematicsUpdate {
    let v_ms = state.speed_kmh / 3.6;
    let max_a = profile.max_acceleration_ms2;
    let pose = state.pose.unwrap_or_default();

    let (speed_kmh, acceleration) = if v_ms < STOP_SPEED_MS && controls.throttle <= 0.0 {
        (0.0, 0.0)
    } else {
        let force = longitudinal_force_n(v_ms, state, controls, vehicle);
        let wanted = (force / vehicle.weight_kg).clamp(-max_a, max_a);
        let next_ms = (v_ms + wanted * dt).clamp(0.0, profile.max_speed_kmh / 3.6);
        let actual = if dt > 0.0 {
            ((next_ms - v_ms) / dt).clamp(-max_a, max_a)
        } else {
            0.0
        };
        ((next_ms * 3.6).clamp(0.0, profile.max_speed_kmh), actual)
    };

    let v = speed_kmh / 3.6;
    let pitch = (state.road_grade_pct / 100.0).atan();
    let steer = controls.steering * vehicle.max_steer_angle_rad;
    let yaw = pose.orientation.z + v * steer.tan() / vehicle.wheelbase_m * dt;
    let velocity = Vec3::new(
        v * pitch.cos() * yaw.cos(),
        v * pitch.cos() * yaw.sin(),
        v * pitch.sin(),
    );
    let position = pose.position.add(velocity.scale(dt * profile.time_scale));

    KinematicsUpdate {
        speed_kmh,
        acceleration_ms2: acceleration,
        distance_delta_m: distance_m(speed_kmh, dt, profile.time_scale),
        pose: Some(Pose {
            position,
            velocity,
            orientation: Vec3::new(0.0, pitch, yaw),
        }),
    }
}

pub fn advance(
    variant: KinematicsVariant,
    state: &VehicleState,
    controls: &ControlInput,
    vehicle: &VehicleSpec,
    dt: f64,
    rng: &mut impl Rng,
) -> KinematicsUpdate {
    let profile = state.mode.profile();
    match variant {
        KinematicsVariant::ModeTarget => step_mode_target(state, profile, dt, rng),
        KinematicsVariant::Pedal => step_pedal(state, controls, profile, vehicle, dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{ECO, SPORT, URBAN};
    use crate::test_fixtures::{base_config, make_rng};
    use crate::DrivingMode;

    fn state_at(speed_kmh: f64) -> VehicleState {
        let mut state = VehicleState::initial(&base_config());
        state.speed_kmh = speed_kmh;
        state.road_grade_pct = 0.0;
        state.wind_speed_ms = 0.0;
        state
    }

    #[test]
    fn tendency_pushes_up_when_slow_and_down_when_fast() {
        assert!(target_speed_tendency(0.0, &SPORT) > 0.0);
        assert!(target_speed_tendency(140.0, &SPORT) < 0.0);
        assert!(target_speed_tendency(90.0, &SPORT).abs() < f64::EPSILON);
    }

    #[test]
    fn tendency_is_capped_by_max_acceleration() {
        assert!((target_speed_tendency(0.0, &SPORT) - 2.0).abs() < 1e-12);
        assert!((target_speed_tendency(150.0, &SPORT) + 1.2).abs() < 1e-12);
    }

    #[test]
    fn mode_target_respects_speed_and_accel_bounds() {
        let mut rng = make_rng();
        let mut state = state_at(0.0);
        for _ in 0..2000 {
            let update = step_mode_target(&state, &URBAN, 0.2, &mut rng);
            assert!((0.0..=URBAN.max_speed_kmh).contains(&update.speed_kmh));
            assert!(update.acceleration_ms2.abs() <= URBAN.max_acceleration_ms2 + 1e-12);
            assert!(update.distance_delta_m >= 0.0);
            state.speed_kmh = update.speed_kmh;
        }
    }

    #[test]
    fn tiny_dt_does_not_blow_up_acceleration() {
        let mut rng = make_rng();
        let update = step_mode_target(&state_at(0.0), &SPORT, 1e-6, &mut rng);
        assert!(update.is_finite());
        assert!(update.acceleration_ms2.abs() <= SPORT.max_acceleration_ms2);
    }

    #[test]
    fn pedal_standstill_without_throttle_stays_put() {
        let mut state = state_at(0.0);
        state.road_grade_pct = 5.0;
        let update = step_pedal(
            &state,
            &ControlInput::default(),
            &ECO,
            &base_config().vehicle,
            0.2,
        );
        assert!(update.speed_kmh.abs() < f64::EPSILON);
        assert!(update.distance_delta_m.abs() < f64::EPSILON);
    }

    #[test]
    fn pedal_throttle_accelerates_and_brake_slows() {
        let vehicle = base_config().vehicle;
        let state = state_at(30.0);
        let go = step_pedal(&state, &ControlInput::new(1.0, 0.0, 0.0), &ECO, &vehicle, 0.2);
        let stop = step_pedal(&state, &ControlInput::new(0.0, 1.0, 0.0), &ECO, &vehicle, 0.2);
        assert!(go.speed_kmh > 30.0);
        assert!(stop.speed_kmh < 30.0);
        assert!(go.acceleration_ms2 <= ECO.max_acceleration_ms2 + 1e-12);
    }

    #[test]
    fn pedal_empty_battery_cuts_traction() {
        let vehicle = base_config().vehicle;
        let mut state = state_at(30.0);
        state.battery_level_pct = 0.0;
        let update = step_pedal(&state, &ControlInput::new(1.0, 0.0, 0.0), &ECO, &vehicle, 0.2);
        assert!(update.speed_kmh < 30.0);
    }

    #[test]
    fn pedal_steering_turns_the_heading() {
        let vehicle = base_config().vehicle;
        let state = state_at(40.0);
        let update = step_pedal(&state, &ControlInput::new(0.3, 0.0, 0.5), &ECO, &vehicle, 0.2);
        let pose = update.pose.unwrap();
        assert!(pose.orientation.z > 0.0);
        assert!((pose.velocity.norm() - update.speed_kmh / 3.6).abs() < 1e-9);
    }

    #[test]
    fn advance_dispatches_on_variant() {
        let config = base_config();
        let mut rng = make_rng();
        let mut state = state_at(20.0);
        state.mode = DrivingMode::Eco;
        let controls = ControlInput::new(0.5, 0.0, 0.0);
        let pedal = advance(KinematicsVariant::Pedal, &state, &controls, &config.vehicle, 0.2, &mut rng);
        let target = advance(
            KinematicsVariant::ModeTarget,
            &state,
            &controls,
            &config.vehicle,
            0.2,
            &mut rng,
        );
        assert!(pedal.pose.is_some());
        assert!(target.pose.is_none());
    }
}

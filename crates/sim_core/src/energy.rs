//! Battery drain, instantaneous power and remaining range.

use crate::config::SimConfig;
use crate::kinematics::{AIR_DENSITY, GRAVITY};
use crate::predictor::{predicted_consumption, ConsumptionFeatures, ConsumptionPredictor};
use crate::{ModeProfile, VehicleState};

/// Auxiliary draw (HVAC, electronics) in kW. Heating costs more while the
/// drivetrain is cold.
const IDLE_DRAW_KW: f64 = 0.5;
const IDLE_DRAW_COLD_KW: f64 = 0.8;
const COLD_MOTOR_C: f64 = 15.0;

/// Below this speed, reported consumption falls back to the mode base.
const CONSUMPTION_MIN_SPEED_KMH: f64 = 5.0;
/// Deceleration beyond which regenerative braking engages, m/s².
const REGEN_THRESHOLD_MS2: f64 = -0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyUpdate {
    pub instant_power_kw: f64,
    pub energy_consumption_kwh_per_100km: f64,
    pub battery_level_pct: f64,
    pub total_energy_kwh: f64,
    pub autonomy_remaining_km: f64,
}

impl EnergyUpdate {
    pub fn is_finite(&self) -> bool {
        self.instant_power_kw.is_finite()
            && self.energy_consumption_kwh_per_100km.is_finite()
            && self.battery_level_pct.is_finite()
            && self.total_energy_kwh.is_finite()
            && self.autonomy_remaining_km.is_finite()
    }
}

/// Drivetrain efficiency derates away from a 25 °C sweet spot, never below 0.7.
pub fn drivetrain_efficiency(motor_temp_c: f64) -> f64 {
    (0.9 - 0.1 * (motor_temp_c - 25.0).abs() / 60.0).max(0.7)
}

/// Net battery power in kW for the state's current speed and acceleration,
/// before the idle draw and event multiplier. Negative while regenerating.
pub fn traction_power_kw(state: &VehicleState, profile: &ModeProfile, config: &SimConfig) -> f64 {
    let vehicle = &config.vehicle;
    let m = vehicle.weight_kg;
    let v = state.speed_kmh / 3.6;
    let a = state.acceleration_ms2;

    let aero = 0.5 * AIR_DENSITY * vehicle.drag_coefficient * vehicle.frontal_area_m2 * v * v;
    let rolling = vehicle.rolling_resistance * m * GRAVITY;
    let grade = m * GRAVITY * (state.road_grade_pct / 100.0).atan().sin();
    let road_power_w = (aero + rolling + grade) * v;
    let accel_power_w = (m * a * v).max(0.0);

    let mut total_kw =
        (road_power_w + accel_power_w) / 1000.0 / drivetrain_efficiency(state.motor_temp_c);
    if a < REGEN_THRESHOLD_MS2 {
        total_kw += (m * a * v * profile.regen_fraction / 1000.0).min(0.0);
    }
    total_kw
}

/// Compute the energy model's outputs from a state whose kinematics have
/// already been updated this tick.
pub fn step(
    state: &VehicleState,
    config: &SimConfig,
    predictor: &dyn ConsumptionPredictor,
    brake: f64,
    consumption_factor: f64,
    dt: f64,
) -> EnergyUpdate {
    let profile = state.mode.profile();
    let idle_kw = if state.motor_temp_c < COLD_MOTOR_C {
        IDLE_DRAW_COLD_KW
    } else {
        IDLE_DRAW_KW
    };
    let power_kw =
        ((traction_power_kw(state, profile, config) + idle_kw) * consumption_factor).max(0.0);

    let energy_consumption_kwh_per_100km = if state.speed_kmh > CONSUMPTION_MIN_SPEED_KMH {
        power_kw / state.speed_kmh * 100.0
    } else {
        profile.base_consumption_kwh_per_100km * consumption_factor
    };

    let capacity = state.battery_capacity_kwh;
    let energy_kwh = power_kw * dt / 3600.0;
    let battery_level_pct = (state.battery_level_pct - energy_kwh / capacity * 100.0).max(0.0);

    let features = ConsumptionFeatures {
        speed_kmh: state.speed_kmh,
        acceleration_ms2: state.acceleration_ms2,
        motor_temp_c: state.motor_temp_c,
        brake,
        battery_level_pct,
        base_consumption_kwh_per_100km: profile.base_consumption_kwh_per_100km,
        target_speed_kmh: profile.target_speed_kmh,
    };
    let remaining_kwh = battery_level_pct / 100.0 * capacity;
    let autonomy_remaining_km = remaining_kwh / predicted_consumption(predictor, &features) * 100.0;

    EnergyUpdate {
        instant_power_kw: power_kw,
        energy_consumption_kwh_per_100km,
        battery_level_pct,
        total_energy_kwh: state.total_energy_kwh + energy_kwh,
        autonomy_remaining_km,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ModeBaselinePredictor;
    use crate::test_fixtures::base_config;

    fn cruising(speed_kmh: f64) -> VehicleState {
        let mut state = VehicleState::initial(&base_config());
        state.speed_kmh = speed_kmh;
        state.acceleration_ms2 = 0.0;
        state.road_grade_pct = 0.0;
        state.wind_speed_ms = 0.0;
        state
    }

    #[test]
    fn efficiency_peaks_at_25c_and_is_floored() {
        assert!((drivetrain_efficiency(25.0) - 0.9).abs() < 1e-12);
        assert!((drivetrain_efficiency(85.0) - 0.8).abs() < 1e-12);
        assert!((drivetrain_efficiency(500.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn standstill_draws_idle_power_only() {
        let config = base_config();
        let update = step(&cruising(0.0), &config, &ModeBaselinePredictor, 0.0, 1.0, 0.2);
        assert!((update.instant_power_kw - IDLE_DRAW_KW).abs() < 1e-12);
        assert!(update.battery_level_pct < 100.0);
    }

    #[test]
    fn cold_motor_raises_idle_draw() {
        let config = SimConfig {
            ambient_temp_c: 5.0,
            ..base_config()
        };
        let mut state = cruising(0.0);
        state.motor_temp_c = 10.0;
        let cold = step(&state, &config, &ModeBaselinePredictor, 0.0, 1.0, 0.2);
        assert!((cold.instant_power_kw - IDLE_DRAW_COLD_KW).abs() < 1e-12);

        // A warm motor in cold weather still draws the normal idle power.
        state.motor_temp_c = 25.0;
        let warm = step(&state, &config, &ModeBaselinePredictor, 0.0, 1.0, 0.2);
        assert!((warm.instant_power_kw - IDLE_DRAW_KW).abs() < 1e-12);
    }

    #[test]
    fn consumption_factor_scales_power_exactly() {
        let config = base_config();
        let state = cruising(50.0);
        let dry = step(&state, &config, &ModeBaselinePredictor, 0.0, 1.0, 0.2);
        let wet = step(&state, &config, &ModeBaselinePredictor, 0.0, 1.1, 0.2);
        assert!((wet.instant_power_kw - dry.instant_power_kw * 1.1).abs() < 1e-9);
        assert!(
            (wet.energy_consumption_kwh_per_100km - dry.energy_consumption_kwh_per_100km * 1.1)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn hard_braking_never_reports_negative_power() {
        let config = base_config();
        let mut state = cruising(50.0);
        state.acceleration_ms2 = -2.0;
        let update = step(&state, &config, &ModeBaselinePredictor, 1.0, 1.0, 0.2);
        assert!(update.instant_power_kw >= 0.0);
        assert!(update.battery_level_pct <= state.battery_level_pct);
    }

    #[test]
    fn empty_pack_stays_at_zero() {
        let config = base_config();
        let mut state = cruising(50.0);
        state.battery_level_pct = 0.0;
        let update = step(&state, &config, &ModeBaselinePredictor, 0.0, 1.0, 0.2);
        assert!(update.battery_level_pct.abs() < f64::EPSILON);
        assert!(update.autonomy_remaining_km.abs() < f64::EPSILON);
    }

    #[test]
    fn cumulative_energy_tracks_battery_drop() {
        let config = base_config();
        let state = cruising(50.0);
        let update = step(&state, &config, &ModeBaselinePredictor, 0.0, 1.0, 1.0);
        let drop_kwh =
            (state.battery_level_pct - update.battery_level_pct) / 100.0 * state.battery_capacity_kwh;
        assert!((update.total_energy_kwh - state.total_energy_kwh - drop_kwh).abs() < 1e-9);
    }
}

//! Simulation configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid config. Call [`SimConfig::validate`] before building a simulation.

use serde::{Deserialize, Serialize};

use crate::predictor::FEATURE_COUNT;
use crate::{DrivingMode, SimError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicsVariant {
    /// Speed is pulled toward the active mode's target speed.
    #[default]
    ModeTarget,
    /// Speed follows throttle/brake/steering through a force balance.
    Pedal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorConfig {
    #[default]
    ModeBaseline,
    Heuristic,
    Linear { intercept: f64, weights: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSpec {
    pub weight_kg: f64,
    pub battery_capacity_kwh: f64,
    pub max_power_kw: f64,
    pub drag_coefficient: f64,
    pub frontal_area_m2: f64,
    pub rolling_resistance: f64,
    pub brake_efficiency: f64,
    pub wheelbase_m: f64,
    pub max_steer_angle_rad: f64,
    pub initial_tire_pressure_bar: f64,
    pub tire_pressure_floor_bar: f64,
    pub initial_autonomy_km: f64,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            weight_kg: 1800.0,
            battery_capacity_kwh: 60.0,
            max_power_kw: 80.0,
            drag_coefficient: 0.30,
            frontal_area_m2: 2.5,
            rolling_resistance: 0.013,
            brake_efficiency: 0.8,
            wheelbase_m: 2.588,
            max_steer_angle_rad: 35.0_f64.to_radians(),
            initial_tire_pressure_bar: 2.4,
            tire_pressure_floor_bar: 1.5,
            initial_autonomy_km: 390.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalSpec {
    pub max_motor_temp_c: f64,
    pub max_brake_temp_c: f64,
    /// First-order approach rate, 1/s.
    pub motor_rate: f64,
    /// First-order approach rate, 1/s.
    pub brake_rate: f64,
    pub initial_motor_temp_c: f64,
}

impl Default for ThermalSpec {
    fn default() -> Self {
        Self {
            max_motor_temp_c: 120.0,
            max_brake_temp_c: 800.0,
            motor_rate: 0.1,
            brake_rate: 0.2,
            initial_motor_temp_c: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub initial_mode: DrivingMode,
    pub kinematics: KinematicsVariant,
    pub tick_interval_ms: u64,
    pub seed: Option<u64>,
    /// Chance per idle tick that an environmental event starts.
    pub event_probability: f64,
    pub ambient_temp_c: f64,
    pub history_len: usize,
    pub max_subscribers: usize,
    pub stop_timeout_ms: u64,
    pub vehicle: VehicleSpec,
    pub thermal: ThermalSpec,
    pub predictor: PredictorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_mode: DrivingMode::Urban,
            kinematics: KinematicsVariant::ModeTarget,
            tick_interval_ms: 200,
            seed: None,
            event_probability: 0.01,
            ambient_temp_c: 20.0,
            history_len: 600,
            max_subscribers: 32,
            stop_timeout_ms: 1000,
            vehicle: VehicleSpec::default(),
            thermal: ThermalSpec::default(),
            predictor: PredictorConfig::default(),
        }
    }
}

fn require(ok: bool, msg: impl FnOnce() -> String) -> Result<(), SimError> {
    if ok {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(msg()))
    }
}

fn positive(name: &str, value: f64) -> Result<(), SimError> {
    require(value.is_finite() && value > 0.0, || {
        format!("{name} must be positive, got {value}")
    })
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        let v = &self.vehicle;
        positive("vehicle.weight_kg", v.weight_kg)?;
        positive("vehicle.battery_capacity_kwh", v.battery_capacity_kwh)?;
        positive("vehicle.max_power_kw", v.max_power_kw)?;
        positive("vehicle.drag_coefficient", v.drag_coefficient)?;
        positive("vehicle.frontal_area_m2", v.frontal_area_m2)?;
        positive("vehicle.wheelbase_m", v.wheelbase_m)?;
        positive("vehicle.tire_pressure_floor_bar", v.tire_pressure_floor_bar)?;
        require(
            v.rolling_resistance.is_finite() && v.rolling_resistance >= 0.0,
            || format!("vehicle.rolling_resistance must be >= 0, got {}", v.rolling_resistance),
        )?;
        require((0.0..=1.0).contains(&v.brake_efficiency), || {
            format!("vehicle.brake_efficiency must be in [0, 1], got {}", v.brake_efficiency)
        })?;
        require(
            v.max_steer_angle_rad > 0.0 && v.max_steer_angle_rad < std::f64::consts::FRAC_PI_2,
            || format!("vehicle.max_steer_angle_rad out of range: {}", v.max_steer_angle_rad),
        )?;
        require(
            v.initial_tire_pressure_bar >= v.tire_pressure_floor_bar,
            || "vehicle.initial_tire_pressure_bar is below the floor".to_string(),
        )?;
        require(
            v.initial_autonomy_km.is_finite() && v.initial_autonomy_km >= 0.0,
            || "vehicle.initial_autonomy_km must be >= 0".to_string(),
        )?;

        let t = &self.thermal;
        require(self.ambient_temp_c.is_finite(), || {
            "ambient_temp_c must be finite".to_string()
        })?;
        require(t.max_motor_temp_c > self.ambient_temp_c, || {
            "thermal.max_motor_temp_c must exceed ambient".to_string()
        })?;
        require(t.max_brake_temp_c > self.ambient_temp_c, || {
            "thermal.max_brake_temp_c must exceed ambient".to_string()
        })?;
        positive("thermal.motor_rate", t.motor_rate)?;
        positive("thermal.brake_rate", t.brake_rate)?;
        require(t.initial_motor_temp_c.is_finite(), || {
            "thermal.initial_motor_temp_c must be finite".to_string()
        })?;

        require((0.0..=1.0).contains(&self.event_probability), || {
            format!("event_probability must be in [0, 1], got {}", self.event_probability)
        })?;
        require(self.tick_interval_ms > 0, || {
            "tick_interval_ms must be > 0".to_string()
        })?;
        require(self.history_len > 0, || "history_len must be > 0".to_string())?;
        require(self.max_subscribers > 0, || {
            "max_subscribers must be > 0".to_string()
        })?;

        if let PredictorConfig::Linear { intercept, weights } = &self.predictor {
            require(weights.len() == FEATURE_COUNT, || {
                format!(
                    "predictor.linear.weights needs {FEATURE_COUNT} entries, got {}",
                    weights.len()
                )
            })?;
            require(
                intercept.is_finite() && weights.iter().all(|w| w.is_finite()),
                || "predictor.linear coefficients must be finite".to_string(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn partial_nested_json_keeps_other_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"kinematics":"pedal","vehicle":{"weight_kg":1500.0}}"#)
                .unwrap();
        assert_eq!(config.kinematics, KinematicsVariant::Pedal);
        assert!((config.vehicle.weight_kg - 1500.0).abs() < f64::EPSILON);
        assert!((config.vehicle.battery_capacity_kwh - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = SimConfig::default();
        config.vehicle.battery_capacity_kwh = 0.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn probability_above_one_is_rejected() {
        let config = SimConfig {
            event_probability: 1.5,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn linear_predictor_needs_full_weight_vector() {
        let config = SimConfig {
            predictor: PredictorConfig::Linear {
                intercept: 10.0,
                weights: vec![0.1, 0.2],
            },
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn predictor_config_parses_tagged_forms() {
        let heuristic: PredictorConfig = serde_json::from_str(r#""heuristic""#).unwrap();
        assert_eq!(heuristic, PredictorConfig::Heuristic);
        let linear: PredictorConfig =
            serde_json::from_str(r#"{"linear":{"intercept":12.0,"weights":[0,0,0,0,0,0,0]}}"#)
                .unwrap();
        assert!(matches!(linear, PredictorConfig::Linear { .. }));
    }
}

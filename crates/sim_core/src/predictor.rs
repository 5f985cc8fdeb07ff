//! Average-consumption estimators used for the remaining-range figure.
//!
//! The engine only needs `predict(features) -> kWh/100km`. A fitted model can
//! be plugged in through [`LinearPredictor`] or a custom implementation; the
//! default [`ModeBaselinePredictor`] needs no training data.

use crate::config::PredictorConfig;

pub const FEATURE_COUNT: usize = 7;

/// Predictions below this are floored before dividing remaining energy.
pub const MIN_CONSUMPTION_KWH_PER_100KM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionFeatures {
    pub speed_kmh: f64,
    pub acceleration_ms2: f64,
    pub motor_temp_c: f64,
    /// 0..1 braking intensity.
    pub brake: f64,
    pub battery_level_pct: f64,
    pub base_consumption_kwh_per_100km: f64,
    pub target_speed_kmh: f64,
}

impl ConsumptionFeatures {
    /// Feature order used by [`LinearPredictor`] weights.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.speed_kmh,
            self.acceleration_ms2,
            self.motor_temp_c,
            self.brake,
            self.battery_level_pct,
            self.base_consumption_kwh_per_100km,
            self.target_speed_kmh,
        ]
    }
}

pub trait ConsumptionPredictor: Send + Sync + std::fmt::Debug {
    /// Expected average consumption in kWh/100km.
    fn predict(&self, features: &ConsumptionFeatures) -> f64;
}

/// Mode base consumption inflated by how far current speed sits above the
/// mode's typical speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeBaselinePredictor;

impl ConsumptionPredictor for ModeBaselinePredictor {
    fn predict(&self, f: &ConsumptionFeatures) -> f64 {
        let ratio = f.speed_kmh / f.target_speed_kmh.max(1.0);
        f.base_consumption_kwh_per_100km * (1.0 + 0.1 * (ratio - 1.0))
    }
}

/// Hand-tuned rule of thumb for a compact EV.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPredictor;

impl ConsumptionPredictor for HeuristicPredictor {
    fn predict(&self, f: &ConsumptionFeatures) -> f64 {
        15.0 + 0.05 * (f.speed_kmh - 50.0).max(0.0)
            + 2.5 * f.acceleration_ms2.abs()
            + 0.2 * (f.motor_temp_c - 20.0).abs()
            + 1.5 * f.brake
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    pub intercept: f64,
    pub weights: [f64; FEATURE_COUNT],
}

impl ConsumptionPredictor for LinearPredictor {
    fn predict(&self, f: &ConsumptionFeatures) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(f.to_array())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Build the predictor named by config. A malformed linear weight vector
/// (rejected by `SimConfig::validate`) falls back to the mode baseline.
pub fn build_predictor(config: &PredictorConfig) -> Box<dyn ConsumptionPredictor> {
    match config {
        PredictorConfig::ModeBaseline => Box::new(ModeBaselinePredictor),
        PredictorConfig::Heuristic => Box::new(HeuristicPredictor),
        PredictorConfig::Linear { intercept, weights } => {
            match <[f64; FEATURE_COUNT]>::try_from(weights.as_slice()) {
                Ok(weights) => Box::new(LinearPredictor {
                    intercept: *intercept,
                    weights,
                }),
                Err(_) => Box::new(ModeBaselinePredictor),
            }
        }
    }
}

/// Prediction floored to a usable divisor. Non-finite predictions fall back
/// to the mode base consumption.
pub fn predicted_consumption(
    predictor: &dyn ConsumptionPredictor,
    features: &ConsumptionFeatures,
) -> f64 {
    let raw = predictor.predict(features);
    let value = if raw.is_finite() {
        raw
    } else {
        features.base_consumption_kwh_per_100km
    };
    value.max(MIN_CONSUMPTION_KWH_PER_100KM)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(speed_kmh: f64) -> ConsumptionFeatures {
        ConsumptionFeatures {
            speed_kmh,
            acceleration_ms2: 0.0,
            motor_temp_c: 20.0,
            brake: 0.0,
            battery_level_pct: 80.0,
            base_consumption_kwh_per_100km: 13.0,
            target_speed_kmh: 60.0,
        }
    }

    #[test]
    fn baseline_equals_base_at_target_speed() {
        let value = ModeBaselinePredictor.predict(&features(60.0));
        assert!((value - 13.0).abs() < 1e-9);
    }

    #[test]
    fn baseline_grows_with_speed_above_target() {
        let slow = ModeBaselinePredictor.predict(&features(60.0));
        let fast = ModeBaselinePredictor.predict(&features(90.0));
        assert!((fast - 13.0 * 1.05).abs() < 1e-9);
        assert!(fast > slow);
    }

    #[test]
    fn heuristic_ignores_speed_below_fifty() {
        let value = HeuristicPredictor.predict(&features(40.0));
        assert!((value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn linear_applies_weights_in_feature_order() {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[0] = 0.1;
        weights[5] = 1.0;
        let p = LinearPredictor {
            intercept: 2.0,
            weights,
        };
        // 2 + 0.1 * 60 + 1.0 * 13
        assert!((p.predict(&features(60.0)) - 21.0).abs() < 1e-9);
    }

    #[derive(Debug)]
    struct Broken;

    impl ConsumptionPredictor for Broken {
        fn predict(&self, _: &ConsumptionFeatures) -> f64 {
            f64::NAN
        }
    }

    #[test]
    fn non_finite_prediction_falls_back_to_base() {
        assert!((predicted_consumption(&Broken, &features(50.0)) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_prediction_is_floored() {
        let p = LinearPredictor {
            intercept: 0.0,
            weights: [0.0; FEATURE_COUNT],
        };
        let value = predicted_consumption(&p, &features(50.0));
        assert!((value - MIN_CONSUMPTION_KWH_PER_100KM).abs() < 1e-9);
    }

    #[test]
    fn build_predictor_falls_back_on_short_weights() {
        let predictor = build_predictor(&PredictorConfig::Linear {
            intercept: 99.0,
            weights: vec![1.0],
        });
        assert!((predictor.predict(&features(60.0)) - 13.0).abs() < 1e-9);
    }
}

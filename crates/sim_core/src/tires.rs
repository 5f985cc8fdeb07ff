//! Slow random tire-pressure drift.

use rand::Rng;

/// Chance per tick, before time scaling, that the tires lose some pressure.
pub const DRIFT_PROBABILITY: f64 = 0.005;
/// Share of drift events that also lose a larger random chunk.
const LEAK_PROBABILITY: f64 = 0.1;
const LEAK_MAX_BAR: f64 = 0.05;

/// New tire pressure after one tick. Never below `floor_bar`, never rises.
pub fn drift(
    pressure_bar: f64,
    floor_bar: f64,
    time_scale: f64,
    dt: f64,
    rng: &mut impl Rng,
) -> f64 {
    if rng.gen::<f64>() >= DRIFT_PROBABILITY * time_scale {
        return pressure_bar.max(floor_bar);
    }
    let mut loss = 0.001 * dt;
    if rng.gen::<f64>() < LEAK_PROBABILITY {
        loss += rng.gen_range(0.0..LEAK_MAX_BAR);
    }
    (pressure_bar - loss).max(floor_bar)
}

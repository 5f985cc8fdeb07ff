use rand::Rng;

use crate::config::{KinematicsVariant, SimConfig};
use crate::events::{EventEffects, EventInjector};
use crate::predictor::ConsumptionPredictor;
use crate::{energy, kinematics, thermal, tires};
use crate::{ControlInput, ModelKind, SimError, SimEvent, VehicleState};

/// Largest dt a single tick will integrate, in simulated seconds.
pub const MAX_TICK_DT_S: f64 = 5.0;

/// Everything a tick reads but does not own.
#[derive(Debug, Clone, Copy)]
pub struct TickEnv<'a> {
    pub config: &'a SimConfig,
    pub predictor: &'a dyn ConsumptionPredictor,
    pub controls: ControlInput,
    /// Elapsed seconds since the previous tick.
    pub dt: f64,
    /// Index of the tick being computed, for error reporting.
    pub tick: u64,
}

/// Clamp dt into `[0, MAX_TICK_DT_S]`; non-finite dt integrates nothing.
pub fn sanitize_dt(dt: f64) -> f64 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_TICK_DT_S)
    } else {
        0.0
    }
}

/// Advance the vehicle by one tick.
///
/// Order of operations:
/// 1. Event injector (may start, apply or end an environmental event).
/// 2. Kinematics.
/// 3. Energy, fed the updated speed and acceleration.
/// 4. Thermal, fed the updated speed and acceleration.
/// 5. Tire-pressure drift.
///
/// Each model's output is committed only if it is finite; otherwise the
/// previous values are kept and a `ModelFault` event is reported. After all
/// models ran, the state is checked against its bounds. A violation is a
/// fatal `InvariantViolation`; the caller must stop ticking.
///
/// Returns all events produced this tick.
pub fn tick(
    state: &mut VehicleState,
    injector: &mut EventInjector,
    env: &TickEnv<'_>,
    rng: &mut impl Rng,
) -> Result<Vec<SimEvent>, SimError> {
    let mut events = Vec::new();
    let previous = state.clone();
    let dt = sanitize_dt(env.dt);
    let controls = env.controls.clamped();

    let effects = run_events(state, injector, rng, &mut events);
    run_kinematics(state, env.config, &controls, dt, rng, &mut events);

    let brake = thermal::brake_intensity(
        env.config.kinematics,
        state,
        &controls,
        state.mode.profile(),
    );
    run_energy(state, env, brake, effects, dt, &mut events);
    run_thermal(state, env.config, brake, dt, &mut events);

    let pressure = tires::drift(
        state.tire_pressure_bar,
        env.config.vehicle.tire_pressure_floor_bar,
        state.mode.profile().time_scale,
        dt,
        rng,
    );
    if pressure.is_finite() {
        state.tire_pressure_bar = pressure;
    } else {
        events.push(fault(ModelKind::Tires, "non-finite tire pressure"));
    }

    if previous.battery_level_pct > 0.0 && state.battery_level_pct <= 0.0 {
        events.push(SimEvent::BatteryDepleted);
    }

    check_invariants(&previous, state, injector, env.config)
        .map_err(|detail| SimError::InvariantViolation {
            tick: env.tick,
            detail,
        })?;
    Ok(events)
}

fn fault(model: ModelKind, detail: &str) -> SimEvent {
    SimEvent::ModelFault {
        model,
        detail: detail.to_string(),
    }
}

fn run_events(
    state: &mut VehicleState,
    injector: &mut EventInjector,
    rng: &mut impl Rng,
    events: &mut Vec<SimEvent>,
) -> EventEffects {
    let mut scratch = state.clone();
    let effects = injector.advance(&mut scratch, state.mode.profile(), rng, events);
    let env_finite = scratch.speed_kmh.is_finite()
        && scratch.road_grade_pct.is_finite()
        && scratch.wind_speed_ms.is_finite()
        && scratch.road_condition.is_finite()
        && effects.consumption_factor.is_finite();
    if env_finite {
        *state = scratch;
        effects
    } else {
        events.push(fault(ModelKind::Events, "non-finite environment after event"));
        EventEffects::default()
    }
}

fn run_kinematics(
    state: &mut VehicleState,
    config: &SimConfig,
    controls: &ControlInput,
    dt: f64,
    rng: &mut impl Rng,
    events: &mut Vec<SimEvent>,
) {
    let update = kinematics::advance(config.kinematics, state, controls, &config.vehicle, dt, rng);
    if update.is_finite() {
        state.speed_kmh = update.speed_kmh;
        state.acceleration_ms2 = update.acceleration_ms2;
        state.total_distance_m += update.distance_delta_m.max(0.0);
        if config.kinematics == KinematicsVariant::Pedal {
            state.pose = update.pose;
        }
    } else {
        // Keep the previous speed but hold it inside the active mode's range.
        state.speed_kmh = state.speed_kmh.clamp(0.0, state.mode.profile().max_speed_kmh);
        state.acceleration_ms2 = 0.0;
        events.push(fault(ModelKind::Kinematics, "non-finite kinematics update"));
    }
}

fn run_energy(
    state: &mut VehicleState,
    env: &TickEnv<'_>,
    brake: f64,
    effects: EventEffects,
    dt: f64,
    events: &mut Vec<SimEvent>,
) {
    let update = energy::step(
        state,
        env.config,
        env.predictor,
        brake,
        effects.consumption_factor,
        dt,
    );
    if update.is_finite() {
        state.instant_power_kw = update.instant_power_kw;
        state.energy_consumption_kwh_per_100km = update.energy_consumption_kwh_per_100km;
        state.battery_level_pct = update.battery_level_pct;
        state.total_energy_kwh = update.total_energy_kwh;
        state.autonomy_remaining_km = update.autonomy_remaining_km;
    } else {
        events.push(fault(ModelKind::Energy, "non-finite energy update"));
    }
}

fn run_thermal(
    state: &mut VehicleState,
    config: &SimConfig,
    brake: f64,
    dt: f64,
    events: &mut Vec<SimEvent>,
) {
    let update = thermal::step(state, config, brake, dt);
    if update.is_finite() {
        state.motor_temp_c = update.motor_temp_c;
        state.brake_temp_c = update.brake_temp_c;
        state.motor_load_pct = update.motor_load_pct;
    } else {
        events.push(fault(ModelKind::Thermal, "non-finite thermal update"));
    }
}

/// Bounds every committed state must satisfy. Returns a description of the
/// first violation found.
pub fn check_invariants(
    previous: &VehicleState,
    state: &VehicleState,
    injector: &EventInjector,
    config: &SimConfig,
) -> Result<(), String> {
    let max_speed = state.mode.profile().max_speed_kmh;
    let ambient = config.ambient_temp_c;
    let floor = config.vehicle.tire_pressure_floor_bar;

    if !state.is_finite() {
        return Err("non-finite value in vehicle state".to_string());
    }
    if !(0.0..=max_speed).contains(&state.speed_kmh) {
        return Err(format!(
            "speed {} km/h outside [0, {max_speed}]",
            state.speed_kmh
        ));
    }
    if !(0.0..=100.0).contains(&state.battery_level_pct) {
        return Err(format!("battery level {}% outside [0, 100]", state.battery_level_pct));
    }
    if state.battery_level_pct > previous.battery_level_pct {
        return Err(format!(
            "battery level rose from {}% to {}%",
            previous.battery_level_pct, state.battery_level_pct
        ));
    }
    if state.motor_temp_c < ambient || state.brake_temp_c < ambient {
        return Err(format!(
            "temperature below ambient {ambient}: motor {}, brake {}",
            state.motor_temp_c, state.brake_temp_c
        ));
    }
    if state.tire_pressure_bar < floor {
        return Err(format!(
            "tire pressure {} below floor {floor}",
            state.tire_pressure_bar
        ));
    }
    if state.total_distance_m < previous.total_distance_m {
        return Err(format!(
            "distance went from {} m to {} m",
            previous.total_distance_m, state.total_distance_m
        ));
    }
    if !(0.0..=100.0).contains(&state.motor_load_pct) {
        return Err(format!("motor load {}% outside [0, 100]", state.motor_load_pct));
    }
    if let Some(event) = injector.active() {
        if event.remaining_ticks == 0 {
            return Err(format!("event {:?} active with no remaining ticks", event.kind));
        }
    }
    Ok(())
}

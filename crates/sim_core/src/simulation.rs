//! One simulated vehicle: state, injector, controls, RNG and clock.
//!
//! `Simulation` is synchronous and owns everything a tick touches, so a
//! caller that holds it exclusively (e.g. behind a mutex) gets consistent
//! snapshots for free.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::config::{KinematicsVariant, SimConfig};
use crate::engine::{self, TickEnv};
use crate::events::{EventInjector, EventKind};
use crate::predictor::{build_predictor, ConsumptionPredictor};
use crate::{new_vehicle_id, ControlInput, DrivingMode, Pose, SimError, SimEvent, Snapshot, VehicleState};

impl VehicleState {
    /// Documented initial values for a fresh or reset vehicle.
    pub fn initial(config: &SimConfig) -> Self {
        let mode = config.initial_mode;
        let ambient = config.ambient_temp_c;
        Self {
            mode,
            speed_kmh: 0.0,
            acceleration_ms2: 0.0,
            total_distance_m: 0.0,
            pose: match config.kinematics {
                KinematicsVariant::Pedal => Some(Pose::default()),
                KinematicsVariant::ModeTarget => None,
            },
            battery_level_pct: 100.0,
            battery_capacity_kwh: config.vehicle.battery_capacity_kwh,
            instant_power_kw: 0.0,
            energy_consumption_kwh_per_100km: mode.profile().base_consumption_kwh_per_100km,
            total_energy_kwh: 0.0,
            autonomy_remaining_km: config.vehicle.initial_autonomy_km,
            motor_temp_c: config.thermal.initial_motor_temp_c.max(ambient),
            brake_temp_c: ambient,
            motor_load_pct: 0.0,
            tire_pressure_bar: config.vehicle.initial_tire_pressure_bar,
            road_grade_pct: 0.0,
            wind_speed_ms: 0.0,
            road_condition: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.speed_kmh,
            self.acceleration_ms2,
            self.total_distance_m,
            self.battery_level_pct,
            self.battery_capacity_kwh,
            self.instant_power_kw,
            self.energy_consumption_kwh_per_100km,
            self.total_energy_kwh,
            self.autonomy_remaining_km,
            self.motor_temp_c,
            self.brake_temp_c,
            self.motor_load_pct,
            self.tire_pressure_bar,
            self.road_grade_pct,
            self.wind_speed_ms,
            self.road_condition,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.pose.as_ref().map_or(true, Pose::is_finite)
    }
}

/// Result of one successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub snapshot: Snapshot,
    pub events: Vec<SimEvent>,
}

#[derive(Debug)]
pub struct Simulation {
    vehicle_id: Uuid,
    config: SimConfig,
    seed: u64,
    rng: ChaCha8Rng,
    state: VehicleState,
    injector: EventInjector,
    controls: ControlInput,
    predictor: Box<dyn ConsumptionPredictor>,
    tick: u64,
    elapsed_s: f64,
}

impl Simulation {
    /// Validate `config` and build a vehicle at its initial state. The same
    /// seed always yields the same vehicle id and the same tick sequence.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self, SimError> {
        config.validate()?;
        let predictor = build_predictor(&config.predictor);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let vehicle_id = new_vehicle_id(&mut rng);
        Ok(Self {
            vehicle_id,
            state: VehicleState::initial(&config),
            injector: EventInjector::new(config.event_probability),
            controls: ControlInput::default(),
            predictor,
            rng,
            seed,
            tick: 0,
            elapsed_s: 0.0,
            config,
        })
    }

    /// Replace the consumption predictor, e.g. with a fitted model.
    #[must_use]
    pub fn with_predictor(mut self, predictor: Box<dyn ConsumptionPredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    /// Advance by `dt` seconds. The tick runs on a copy of the state and
    /// injector, committed only on success: on `Err` the last good snapshot
    /// stays in place and the caller must stop stepping.
    pub fn step(&mut self, dt: f64) -> Result<TickOutput, SimError> {
        let dt = engine::sanitize_dt(dt);
        let env = TickEnv {
            config: &self.config,
            predictor: self.predictor.as_ref(),
            controls: self.controls,
            dt,
            tick: self.tick,
        };
        let mut state = self.state.clone();
        let mut injector = self.injector.clone();
        let events = engine::tick(&mut state, &mut injector, &env, &mut self.rng)?;
        self.state = state;
        self.injector = injector;
        self.tick += 1;
        self.elapsed_s += dt;
        Ok(TickOutput {
            snapshot: self.snapshot(),
            events,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            vehicle_id: self.vehicle_id,
            tick: self.tick,
            timestamp_s: self.elapsed_s,
            state: self.state.clone(),
            controls: self.controls,
            active_event: self.injector.active().cloned(),
        }
    }

    /// Return every field to its initial value, drop any active event and
    /// reseed the RNG so a reset run replays the original one.
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.vehicle_id = new_vehicle_id(&mut self.rng);
        self.state = VehicleState::initial(&self.config);
        self.injector.reset();
        self.controls = ControlInput::default();
        self.tick = 0;
        self.elapsed_s = 0.0;
    }

    /// Switch profile by key. Unknown keys are rejected and nothing changes.
    pub fn change_mode(&mut self, key: &str) -> Result<SimEvent, SimError> {
        let mode = DrivingMode::parse(key).ok_or_else(|| SimError::UnknownMode(key.to_string()))?;
        Ok(self.set_mode(mode))
    }

    pub fn set_mode(&mut self, mode: DrivingMode) -> SimEvent {
        let from = self.state.mode;
        self.state.mode = mode;
        SimEvent::ModeChanged { from, to: mode }
    }

    /// Replace all controls. Values are clamped.
    pub fn set_controls(&mut self, controls: ControlInput) {
        self.controls = controls.clamped();
    }

    /// Update only the given controls. Values are clamped.
    pub fn update_controls(
        &mut self,
        throttle: Option<f64>,
        brake: Option<f64>,
        steering: Option<f64>,
    ) -> ControlInput {
        let mut next = self.controls;
        if let Some(t) = throttle {
            next.throttle = t;
        }
        if let Some(b) = brake {
            next.brake = b;
        }
        if let Some(s) = steering {
            next.steering = s;
        }
        self.controls = next.clamped();
        self.controls
    }

    /// Start an environmental event now with its default duration. Returns
    /// false if one is already active.
    pub fn inject_event(&mut self, kind: EventKind) -> bool {
        self.injector.inject(kind, kind.default_duration_ticks())
    }

    pub fn vehicle_id(&self) -> Uuid {
        self.vehicle_id
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn controls(&self) -> ControlInput {
        self.controls
    }

    pub fn injector(&self) -> &EventInjector {
        &self.injector
    }

    pub fn mode(&self) -> DrivingMode {
        self.state.mode
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    /// Direct state access for tests that need to stage a scenario.
    #[cfg(any(test, feature = "test-support"))]
    pub fn state_mut(&mut self) -> &mut VehicleState {
        &mut self.state
    }
}

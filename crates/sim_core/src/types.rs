//! Type definitions for `sim_core`.
//!
//! Vehicle state, control input, snapshots, and the events a tick reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Event, EventKind};

// ---------------------------------------------------------------------------
// Driving modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivingMode {
    #[default]
    Urban,
    Sport,
    Highway,
    Eco,
}

impl DrivingMode {
    pub const ALL: [DrivingMode; 4] = [
        DrivingMode::Urban,
        DrivingMode::Sport,
        DrivingMode::Highway,
        DrivingMode::Eco,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DrivingMode::Urban => "urban",
            DrivingMode::Sport => "sport",
            DrivingMode::Highway => "highway",
            DrivingMode::Eco => "eco",
        }
    }

    /// Case-insensitive. Also accepts the legacy dashboard keys
    /// `urbain` and `autoroute`.
    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "urban" | "urbain" => Some(DrivingMode::Urban),
            "sport" => Some(DrivingMode::Sport),
            "highway" | "autoroute" => Some(DrivingMode::Highway),
            "eco" => Some(DrivingMode::Eco),
            _ => None,
        }
    }
}

impl std::fmt::Display for DrivingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(self, other: Vec3) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 3D pose carried by the pedal kinematics variant. The mode-target variant
/// tracks cumulative distance only and leaves `VehicleState::pose` empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Meters, world frame.
    pub position: Vec3,
    /// m/s, world frame.
    pub velocity: Vec3,
    /// Roll, pitch, yaw in radians.
    pub orientation: Vec3,
}

impl Pose {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.orientation.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Pedal and steering input. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// 0..1
    pub throttle: f64,
    /// 0..1
    pub brake: f64,
    /// -1 (left) ..1 (right)
    pub steering: f64,
}

impl ControlInput {
    pub fn new(throttle: f64, brake: f64, steering: f64) -> Self {
        Self {
            throttle,
            brake,
            steering,
        }
        .clamped()
    }

    /// NaN inputs collapse to zero.
    pub fn clamped(self) -> Self {
        Self {
            throttle: clamp_or_zero(self.throttle, 0.0, 1.0),
            brake: clamp_or_zero(self.brake, 0.0, 1.0),
            steering: clamp_or_zero(self.steering, -1.0, 1.0),
        }
    }
}

fn clamp_or_zero(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, max)
    }
}

// ---------------------------------------------------------------------------
// Vehicle state
// ---------------------------------------------------------------------------

/// Full physical state of one simulated vehicle at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub mode: DrivingMode,

    // Kinematics
    pub speed_kmh: f64,
    pub acceleration_ms2: f64,
    pub total_distance_m: f64,
    pub pose: Option<Pose>,

    // Energy
    pub battery_level_pct: f64,
    pub battery_capacity_kwh: f64,
    pub instant_power_kw: f64,
    pub energy_consumption_kwh_per_100km: f64,
    /// Cumulative energy drawn from the pack since reset.
    pub total_energy_kwh: f64,
    pub autonomy_remaining_km: f64,

    // Thermal
    pub motor_temp_c: f64,
    pub brake_temp_c: f64,
    pub motor_load_pct: f64,

    pub tire_pressure_bar: f64,

    // Environment, mostly driven by the event injector
    pub road_grade_pct: f64,
    pub wind_speed_ms: f64,
    /// 0 = dry, 0.5 = damp, 1 = wet.
    pub road_condition: f64,
}

// ---------------------------------------------------------------------------
// Snapshots and events
// ---------------------------------------------------------------------------

/// Immutable copy of the vehicle state at one tick. This is the only value
/// handed to subscribers and transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub vehicle_id: Uuid,
    pub tick: u64,
    /// Simulated seconds since the last reset.
    pub timestamp_s: f64,
    #[serde(flatten)]
    pub state: VehicleState,
    pub controls: ControlInput,
    pub active_event: Option<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Events,
    Kinematics,
    Energy,
    Thermal,
    Tires,
}

/// Notable things that happened during a tick or a control call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    EnvironmentEventStarted {
        kind: EventKind,
        description: String,
        duration_ticks: u32,
    },
    EnvironmentEventEnded {
        kind: EventKind,
    },
    /// A model produced a non-finite result; its output was discarded for
    /// this tick and the previous values kept.
    ModelFault {
        model: ModelKind,
        detail: String,
    },
    BatteryDepleted,
    ModeChanged {
        from: DrivingMode,
        to: DrivingMode,
    },
}

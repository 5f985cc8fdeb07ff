use serde::{Deserialize, Serialize};
use sim_core::{ControlInput, ModeProfile, VehicleState};

/// Anything that decides pedal and steering input once per tick.
pub trait ControlSource {
    fn controls(&mut self, state: &VehicleState, profile: &ModeProfile) -> ControlInput;
}

/// Pedals set from outside (HTTP, CLI flags). Every setter clamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualControls {
    input: ControlInput,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlUpdate {
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub steering: Option<f64>,
}

impl ManualControls {
    pub fn new(input: ControlInput) -> Self {
        Self {
            input: input.clamped(),
        }
    }

    pub fn current(&self) -> ControlInput {
        self.input
    }

    pub fn apply(&mut self, update: ControlUpdate) -> ControlInput {
        let mut next = self.input;
        if let Some(t) = update.throttle {
            next.throttle = t;
        }
        if let Some(b) = update.brake {
            next.brake = b;
        }
        if let Some(s) = update.steering {
            next.steering = s;
        }
        self.input = next.clamped();
        self.input
    }

    pub fn release(&mut self) {
        self.input = ControlInput::default();
    }
}

impl ControlSource for ManualControls {
    fn controls(&mut self, _state: &VehicleState, _profile: &ModeProfile) -> ControlInput {
        self.input
    }
}

/// Scripted driver: a steady throttle, or a simple proportional cruise
/// controller when `hold_speed_kmh` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CruiseDriver {
    pub throttle: f64,
    /// Cruise setpoint, capped at the active mode's max speed.
    pub hold_speed_kmh: Option<f64>,
    pub steering: f64,
}

/// Throttle change per km/h of speed error.
const CRUISE_GAIN: f64 = 0.05;
/// Overspeed in km/h before the cruise controller starts braking.
const CRUISE_BRAKE_MARGIN_KMH: f64 = 5.0;

impl CruiseDriver {
    pub fn steady(throttle: f64) -> Self {
        Self {
            throttle,
            hold_speed_kmh: None,
            steering: 0.0,
        }
    }

    pub fn holding(speed_kmh: f64, throttle: f64) -> Self {
        Self {
            throttle,
            hold_speed_kmh: Some(speed_kmh),
            steering: 0.0,
        }
    }
}

impl ControlSource for CruiseDriver {
    fn controls(&mut self, state: &VehicleState, profile: &ModeProfile) -> ControlInput {
        let Some(setpoint) = self.hold_speed_kmh else {
            return ControlInput::new(self.throttle, 0.0, self.steering);
        };
        let error = setpoint.min(profile.max_speed_kmh) - state.speed_kmh;
        let throttle = self.throttle + CRUISE_GAIN * error;
        let brake = if error < -CRUISE_BRAKE_MARGIN_KMH {
            CRUISE_GAIN * (-error - CRUISE_BRAKE_MARGIN_KMH)
        } else {
            0.0
        };
        ControlInput::new(throttle, brake, self.steering)
    }
}

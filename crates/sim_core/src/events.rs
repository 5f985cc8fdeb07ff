//! Environmental event injector.
//!
//! At most one event is active at a time. While idle, each tick has a small
//! chance of starting an event drawn uniformly from the mode's candidates.
//! While active, the event's effect is applied every tick; on expiry the
//! environment it touched is reverted and the injector returns to idle.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{DrivingMode, ModeProfile, SimEvent, VehicleState};

/// Rain multiplies instantaneous power and reported consumption.
pub const RAIN_CONSUMPTION_FACTOR: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    HeavyTraffic,
    ClearRoad,
    Rain,
    CrossWind,
    Climb,
    RedLight,
    TollBooth,
}

impl EventKind {
    pub fn description(self) -> &'static str {
        match self {
            EventKind::HeavyTraffic => "Heavy traffic",
            EventKind::ClearRoad => "Clear road",
            EventKind::Rain => "Rain",
            EventKind::CrossWind => "Strong cross wind",
            EventKind::Climb => "Steep climb",
            EventKind::RedLight => "Red light",
            EventKind::TollBooth => "Toll booth",
        }
    }

    /// Duration in ticks when injected without an explicit one.
    pub fn default_duration_ticks(self) -> u32 {
        match self {
            EventKind::HeavyTraffic => 50,
            EventKind::ClearRoad => 40,
            EventKind::Rain => 60,
            EventKind::CrossWind => 30,
            EventKind::Climb => 25,
            EventKind::RedLight => 15,
            EventKind::TollBooth => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub remaining_ticks: u32,
    pub description: String,
}

impl Event {
    pub fn new(kind: EventKind, duration_ticks: u32) -> Self {
        Self {
            kind,
            remaining_ticks: duration_ticks,
            description: kind.description().to_string(),
        }
    }
}

/// Multipliers the active event imposes on downstream models this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventEffects {
    pub consumption_factor: f64,
}

impl Default for EventEffects {
    fn default() -> Self {
        Self {
            consumption_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InjectorState {
    #[default]
    Idle,
    Active(Event),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventInjector {
    state: InjectorState,
    probability: f64,
}

impl EventInjector {
    pub fn new(probability: f64) -> Self {
        Self {
            state: InjectorState::Idle,
            probability: if probability.is_finite() {
                probability.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn state(&self) -> &InjectorState {
        &self.state
    }

    pub fn active(&self) -> Option<&Event> {
        match &self.state {
            InjectorState::Active(event) => Some(event),
            InjectorState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InjectorState::Idle)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Drop any active event without reverting the environment. Used on a
    /// full simulation reset where the state is rebuilt anyway.
    pub fn reset(&mut self) {
        self.state = InjectorState::Idle;
    }

    /// Candidate events and their durations for a mode.
    pub fn candidates(mode: DrivingMode) -> SmallVec<[(EventKind, u32); 8]> {
        let mut out: SmallVec<[(EventKind, u32); 8]> = [
            EventKind::HeavyTraffic,
            EventKind::ClearRoad,
            EventKind::Rain,
            EventKind::CrossWind,
            EventKind::Climb,
        ]
        .into_iter()
        .map(|kind| (kind, kind.default_duration_ticks()))
        .collect();
        match mode {
            DrivingMode::Urban => {
                out.push((EventKind::HeavyTraffic, EventKind::HeavyTraffic.default_duration_ticks()));
                out.push((EventKind::RedLight, EventKind::RedLight.default_duration_ticks()));
            }
            DrivingMode::Highway => {
                out.push((EventKind::TollBooth, EventKind::TollBooth.default_duration_ticks()));
                // Long clear stretches are more common on the highway.
                out.push((EventKind::ClearRoad, 70));
            }
            DrivingMode::Sport | DrivingMode::Eco => {}
        }
        out
    }

    /// Start `kind` immediately. Returns false (and changes nothing) when an
    /// event is already active or the duration is zero.
    pub fn inject(&mut self, kind: EventKind, duration_ticks: u32) -> bool {
        if !self.is_idle() || duration_ticks == 0 {
            return false;
        }
        self.state = InjectorState::Active(Event::new(kind, duration_ticks));
        true
    }

    /// One injector step. Mutates the environment fields of `state` and
    /// returns the multipliers downstream models must apply this tick.
    ///
    /// A drawn event takes effect on the tick it is drawn, so it stays
    /// active for exactly its duration. The final tick still applies the
    /// effect before reverting.
    pub fn advance(
        &mut self,
        state: &mut VehicleState,
        profile: &ModeProfile,
        rng: &mut impl Rng,
        events: &mut Vec<SimEvent>,
    ) -> EventEffects {
        if self.is_idle() {
            let fires = self.probability > 0.0 && rng.gen::<f64>() < self.probability;
            if !fires {
                return EventEffects::default();
            }
            let candidates = Self::candidates(state.mode);
            let (kind, duration) = candidates[rng.gen_range(0..candidates.len())];
            events.push(SimEvent::EnvironmentEventStarted {
                kind,
                description: kind.description().to_string(),
                duration_ticks: duration,
            });
            self.state = InjectorState::Active(Event::new(kind, duration));
        }
        let InjectorState::Active(event) = &mut self.state else {
            return EventEffects::default();
        };

        let effects = apply_effect(event.kind, state, profile, rng);
        event.remaining_ticks = event.remaining_ticks.saturating_sub(1);
        if event.remaining_ticks == 0 {
            let kind = event.kind;
            revert_effect(kind, state, rng);
            events.push(SimEvent::EnvironmentEventEnded { kind });
            self.state = InjectorState::Idle;
        }
        effects
    }
}

fn apply_effect(
    kind: EventKind,
    state: &mut VehicleState,
    profile: &ModeProfile,
    rng: &mut impl Rng,
) -> EventEffects {
    let mut effects = EventEffects::default();
    match kind {
        EventKind::HeavyTraffic => state.speed_kmh *= 0.95,
        EventKind::ClearRoad => {
            state.speed_kmh = (state.speed_kmh * 1.05).min(profile.max_speed_kmh);
        }
        EventKind::Rain => {
            state.road_condition = 1.0;
            effects.consumption_factor = RAIN_CONSUMPTION_FACTOR;
        }
        EventKind::CrossWind => state.wind_speed_ms = rng.gen_range(8.0..=15.0),
        EventKind::Climb => state.road_grade_pct = rng.gen_range(3.0..=8.0),
        EventKind::RedLight => state.speed_kmh = (state.speed_kmh - 10.0).max(0.0),
        EventKind::TollBooth => state.speed_kmh = (state.speed_kmh - 5.0).max(0.0),
    }
    effects
}

fn revert_effect(kind: EventKind, state: &mut VehicleState, rng: &mut impl Rng) {
    match kind {
        EventKind::Rain => state.road_condition = 0.0,
        EventKind::CrossWind => state.wind_speed_ms = rng.gen_range(-2.0..=2.0),
        EventKind::Climb => state.road_grade_pct = rng.gen_range(-2.0..=2.0),
        EventKind::HeavyTraffic
        | EventKind::ClearRoad
        | EventKind::RedLight
        | EventKind::TollBooth => {}
    }
}

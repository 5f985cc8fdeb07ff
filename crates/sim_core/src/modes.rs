//! Driving-mode parameter table.
//!
//! Profiles are compile-time constants and never mutated at runtime.

use serde::Serialize;

use crate::DrivingMode;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeProfile {
    pub max_speed_kmh: f64,
    /// Cruising speed the mode-target kinematics pulls toward.
    pub target_speed_kmh: f64,
    pub max_acceleration_ms2: f64,
    /// Standard deviation of per-tick speed noise is `speed_variation / 10` km/h.
    pub speed_variation: f64,
    pub base_consumption_kwh_per_100km: f64,
    /// Scales simulated dynamics, never the wall-clock tick cadence.
    pub time_scale: f64,
    /// Share of braking power recovered into the pack.
    pub regen_fraction: f64,
}

pub const URBAN: ModeProfile = ModeProfile {
    max_speed_kmh: 50.0,
    target_speed_kmh: 30.0,
    max_acceleration_ms2: 2.0,
    speed_variation: 15.0,
    base_consumption_kwh_per_100km: 16.0,
    time_scale: 1.0,
    regen_fraction: 0.4,
};

pub const SPORT: ModeProfile = ModeProfile {
    max_speed_kmh: 150.0,
    target_speed_kmh: 90.0,
    max_acceleration_ms2: 4.0,
    speed_variation: 25.0,
    base_consumption_kwh_per_100km: 25.0,
    time_scale: 1.5,
    regen_fraction: 0.2,
};

pub const HIGHWAY: ModeProfile = ModeProfile {
    max_speed_kmh: 130.0,
    target_speed_kmh: 110.0,
    max_acceleration_ms2: 1.5,
    speed_variation: 10.0,
    base_consumption_kwh_per_100km: 21.0,
    time_scale: 1.2,
    regen_fraction: 0.1,
};

pub const ECO: ModeProfile = ModeProfile {
    max_speed_kmh: 90.0,
    target_speed_kmh: 60.0,
    max_acceleration_ms2: 1.0,
    speed_variation: 5.0,
    base_consumption_kwh_per_100km: 13.0,
    time_scale: 0.8,
    regen_fraction: 0.5,
};

impl ModeProfile {
    pub fn for_mode(mode: DrivingMode) -> &'static ModeProfile {
        match mode {
            DrivingMode::Urban => &URBAN,
            DrivingMode::Sport => &SPORT,
            DrivingMode::Highway => &HIGHWAY,
            DrivingMode::Eco => &ECO,
        }
    }

    /// Unknown keys fail closed to Urban.
    pub fn lookup(key: &str) -> &'static ModeProfile {
        DrivingMode::parse(key).map_or(&URBAN, Self::for_mode)
    }
}

impl DrivingMode {
    pub fn profile(self) -> &'static ModeProfile {
        ModeProfile::for_mode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_has_a_profile_with_target_below_max() {
        for mode in DrivingMode::ALL {
            let p = mode.profile();
            assert!(p.target_speed_kmh < p.max_speed_kmh, "{mode}");
            assert!(p.max_acceleration_ms2 > 0.0, "{mode}");
            assert!(p.base_consumption_kwh_per_100km > 0.0, "{mode}");
            assert!((0.0..=1.0).contains(&p.regen_fraction), "{mode}");
        }
    }

    #[test]
    fn lookup_resolves_known_and_legacy_keys() {
        assert_eq!(ModeProfile::lookup("sport"), &SPORT);
        assert_eq!(ModeProfile::lookup("Highway"), &HIGHWAY);
        assert_eq!(ModeProfile::lookup("autoroute"), &HIGHWAY);
        assert_eq!(ModeProfile::lookup(" eco "), &ECO);
    }

    #[test]
    fn unknown_key_fails_closed_to_urban() {
        assert_eq!(ModeProfile::lookup("warp"), &URBAN);
        assert_eq!(ModeProfile::lookup(""), &URBAN);
    }

    #[test]
    fn mode_keys_round_trip_through_parse() {
        for mode in DrivingMode::ALL {
            assert_eq!(DrivingMode::parse(mode.key()), Some(mode));
        }
    }
}

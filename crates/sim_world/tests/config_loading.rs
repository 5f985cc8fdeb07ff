//! Config loading tests.
//!
//! These load the shipped `content/sim_config.json` and a handful of
//! hand-written files to check parsing, defaults and validation errors.

use sim_core::{DrivingMode, KinematicsVariant, PredictorConfig, SimConfig};
use sim_world::{build_simulation, load_config, load_config_or_default, resolve_seed};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Integration tests run from the crate directory, so go up two levels.
fn content_path() -> PathBuf {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    PathBuf::from(manifest).join("../../content/sim_config.json")
}

fn shipped_config() -> &'static SimConfig {
    static CONFIG: OnceLock<SimConfig> = OnceLock::new();
    CONFIG.get_or_init(|| load_config(&content_path()).expect("shipped config should load"))
}

fn write_temp(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn shipped_config_matches_builtin_defaults() {
    assert_eq!(shipped_config(), &SimConfig::default());
}

#[test]
fn shipped_config_has_a_nominal_cadence() {
    let config = shipped_config();
    assert_eq!(config.tick_interval_ms, 200);
    assert!(config.stop_timeout_ms >= config.tick_interval_ms);
}

#[test]
fn partial_file_keeps_defaults() {
    let file = write_temp(r#"{"initial_mode":"eco","kinematics":"pedal","predictor":"heuristic"}"#);
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.initial_mode, DrivingMode::Eco);
    assert_eq!(config.kinematics, KinematicsVariant::Pedal);
    assert_eq!(config.predictor, PredictorConfig::Heuristic);
    assert_eq!(config.history_len, SimConfig::default().history_len);
}

#[test]
fn missing_file_reports_the_path() {
    let err = load_config(std::path::Path::new("/nonexistent/sim.json")).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/sim.json"));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let file = write_temp("{ not json");
    let err = load_config(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("parsing"));
}

#[test]
fn out_of_range_values_fail_validation() {
    let file = write_temp(r#"{"vehicle":{"battery_capacity_kwh":0.0}}"#);
    let err = load_config(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("validating"));
    assert!(message.contains("battery_capacity_kwh"));
}

#[test]
fn unknown_mode_in_file_is_rejected() {
    let file = write_temp(r#"{"initial_mode":"warp"}"#);
    assert!(load_config(file.path()).is_err());
}

#[test]
fn no_path_means_defaults() {
    assert_eq!(load_config_or_default(None).unwrap(), SimConfig::default());
}

#[test]
fn seed_precedence_is_override_then_config() {
    let config = SimConfig {
        seed: Some(5),
        ..SimConfig::default()
    };
    assert_eq!(resolve_seed(&config, Some(9)), 9);
    assert_eq!(resolve_seed(&config, None), 5);
    let sim = build_simulation(config, None).unwrap();
    assert_eq!(sim.seed(), 5);
}

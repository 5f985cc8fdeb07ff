use super::*;

#[test]
fn same_seed_same_snapshots() {
    let config = config_with_events(0.05);
    let mut a = seeded_sim(config.clone());
    let mut b = seeded_sim(config);
    let dts = [0.2, 0.19, 0.21, 0.5, 0.2];
    for i in 0..2000 {
        let dt = dts[i % dts.len()];
        assert_eq!(a.step(dt).unwrap(), b.step(dt).unwrap(), "diverged at tick {i}");
    }
}

#[test]
fn different_seeds_diverge() {
    let config = base_config();
    let mut a = Simulation::new(config.clone(), 1).unwrap();
    let mut b = Simulation::new(config, 2).unwrap();
    assert_ne!(a.vehicle_id(), b.vehicle_id());
    let sa: Vec<f64> = run(&mut a, 50).iter().map(|o| o.snapshot.state.speed_kmh).collect();
    let sb: Vec<f64> = run(&mut b, 50).iter().map(|o| o.snapshot.state.speed_kmh).collect();
    assert_ne!(sa, sb);
}

#[test]
fn reset_replays_the_original_run() {
    let mut sim = seeded_sim(config_with_events(0.05));
    let first = run(&mut sim, 500);
    sim.reset();
    let second = run(&mut sim, 500);
    assert_eq!(first, second);
}

#[test]
fn snapshot_serializes_flat_with_identity_fields() {
    let mut sim = seeded_sim(base_config());
    let output = sim.step(DT).unwrap();
    let json = serde_json::to_value(&output.snapshot).unwrap();
    assert_eq!(json["tick"], 1);
    assert_eq!(json["mode"], "urban");
    assert!(json["speed_kmh"].is_number());
    assert!(json["battery_level_pct"].is_number());
    assert!(json["active_event"].is_null());
    assert_eq!(json["vehicle_id"], sim.vehicle_id().to_string());
    assert_eq!(TEST_SEED, sim.seed());
}

use super::*;
use crate::kinematics::target_speed_tendency;

#[test]
fn unknown_mode_is_rejected_without_side_effects() {
    let mut sim = seeded_sim(base_config());
    run(&mut sim, 10);
    let before = sim.snapshot();
    let err = sim.change_mode("warp").unwrap_err();
    assert_eq!(err, SimError::UnknownMode("warp".to_string()));
    assert_eq!(sim.snapshot(), before);
}

#[test]
fn change_mode_reports_transition() {
    let mut sim = seeded_sim(base_config());
    let event = sim.change_mode("Highway").unwrap();
    assert_eq!(
        event,
        SimEvent::ModeChanged {
            from: DrivingMode::Urban,
            to: DrivingMode::Highway
        }
    );
    assert_eq!(sim.mode(), DrivingMode::Highway);
}

#[test]
fn sport_pulls_speed_up_from_urban_cruise_and_respects_its_cap() {
    let mut sim = seeded_sim(base_config());
    run(&mut sim, 200);
    let cruise = sim.state().speed_kmh;
    assert!(cruise <= 50.0);

    sim.change_mode("sport").unwrap();
    // The very next tick already sees a positive pull toward the sport target.
    assert!(target_speed_tendency(sim.state().speed_kmh, DrivingMode::Sport.profile()) > 0.0);

    let outputs = run(&mut sim, 300);
    assert_eq!(outputs[0].snapshot.state.mode, DrivingMode::Sport);
    for output in &outputs {
        assert!(output.snapshot.state.speed_kmh <= 150.0);
    }
    let end = outputs.last().unwrap().snapshot.state.speed_kmh;
    assert!(end > 60.0, "expected to approach the sport target, got {end}");
}

#[test]
fn downshifting_mode_clamps_speed_within_one_tick() {
    let mut sim = seeded_sim(base_config());
    sim.set_mode(DrivingMode::Sport);
    run(&mut sim, 300);
    assert!(sim.state().speed_kmh > 50.0);
    sim.set_mode(DrivingMode::Urban);
    let output = sim.step(DT).unwrap();
    assert!(output.snapshot.state.speed_kmh <= 50.0);
}

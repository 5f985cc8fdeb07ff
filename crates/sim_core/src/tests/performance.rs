use super::*;

#[test]
fn tick_throughput_exceeds_5k_per_second() {
    let mut sim = seeded_sim(config_with_events(0.05));
    let tick_count = 20_000u64;

    let start = std::time::Instant::now();
    for _ in 0..tick_count {
        sim.step(DT).unwrap();
    }
    let elapsed = start.elapsed();

    let ticks_per_sec = tick_count as f64 / elapsed.as_secs_f64();
    assert!(
        ticks_per_sec >= 5_000.0,
        "expected >= 5k ticks/sec, got {ticks_per_sec:.0} ticks/sec ({tick_count} ticks in {elapsed:.2?})"
    );
}

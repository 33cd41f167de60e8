//! End-to-end against the simulated bench: the travel estimate tracks the stage
//! and compression shows up as positive absolute force.
#![cfg(feature = "hardware-errors")]

use rig_core::motion;
use rig_core::{Direction, JogCommand, Rig, SpeedTier, TestMode};
use rig_hardware::{SimBench, SimOptions};
use rig_traits::clock::{Clock, ManualClock};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn reverse_jog_compresses_specimen() {
    let clock = ManualClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    let bench = SimBench::with_clock(SimOptions::default(), shared.clone());
    let (analog, motor) = bench.split();
    let mut rig = Rig::builder()
        .with_analog(analog)
        .with_motor(motor)
        .with_clock(shared)
        .with_mode(TestMode::Compression)
        .build()
        .unwrap();

    let zero = rig.startup().unwrap();
    assert!((zero - SimOptions::default().zero_volts).abs() < 1e-12);
    assert!(bench.driver_enabled());

    rig.jog
        .apply(JogCommand::Move(Direction::Reverse, SpeedTier::Fast))
        .unwrap();
    let mut last = None;
    for _ in 0..20 {
        clock.advance(Duration::from_millis(100));
        last = Some(rig.station.tick().unwrap());
    }
    let r = last.unwrap();
    let est = motion::lock(&rig.station.motion()).travel_in();
    assert!((est - bench.position_in()).abs() < 1e-9);
    assert!(r.abs_travel > 0.1);
    assert!(r.abs_force > 50.0, "abs force {}", r.abs_force);

    rig.jog.shutdown();
    assert!(!bench.driver_enabled());
    assert_eq!(bench.live_generators(), 0);
    assert_eq!(bench.max_live_generators(), 1);
}

#[test]
fn startup_fails_when_sensor_is_down() {
    let bench = SimBench::default();
    bench.fail_reads_after(0);
    let (analog, motor) = bench.split();
    let mut rig = Rig::builder()
        .with_analog(analog)
        .with_motor(motor)
        .build()
        .unwrap();
    let err = rig.startup().unwrap_err();
    assert!(rig_core::error::rig_error(&err).is_some_and(|e| e.is_fatal()));
    assert!(!bench.driver_enabled());
}

use std::sync::Arc;
use std::time::Duration;

use rig_hardware::{SimBench, SimEvent, SimOptions};
use rig_traits::{AnalogInput, Level, Line, ManualClock, MotorLines, PulseSpec};
use rstest::rstest;

fn bench() -> (SimBench, ManualClock) {
    let clock = ManualClock::new();
    let opts = SimOptions {
        travel_in_per_pulse: 0.0005,
        contact_gap_in: 0.0,
        ..SimOptions::default()
    };
    (SimBench::with_clock(opts, Arc::new(clock.clone())), clock)
}

#[rstest]
#[case(true, 1.0)]
#[case(false, -1.0)]
fn direction_line_sets_travel_sign(#[case] dir_high: bool, #[case] sign: f64) {
    let (bench, clock) = bench();
    let (_, mut motor) = bench.split();
    motor.write_line(Line::Enable, false).unwrap();
    motor.write_line(Line::Direction, dir_high).unwrap();
    let _h = motor
        .start_pulses(PulseSpec {
            frequency_hz: 200.0,
            duty_cycle: 0.5,
            idle_level: Level::Low,
        })
        .unwrap();
    clock.advance(Duration::from_millis(500));
    let expected = sign * 200.0 * 0.5 * 0.0005;
    assert!((bench.position_in() - expected).abs() < 1e-12);
}

#[test]
fn halves_work_from_separate_threads() {
    let (bench, clock) = bench();
    let (mut analog, mut motor) = bench.split();

    let jog = std::thread::spawn(move || {
        motor.write_line(Line::Enable, false).unwrap();
        let h = motor
            .start_pulses(PulseSpec {
                frequency_hz: 1000.0,
                duty_cycle: 0.5,
                idle_level: Level::Low,
            })
            .unwrap();
        clock.advance(Duration::from_secs(1));
        motor.stop_and_release(h).unwrap();
        motor.close().unwrap();
    });
    jog.join().unwrap();

    // Direction line stayed low: the stage moved down into the specimen.
    let v = analog.read_volts().unwrap();
    assert!(v < SimOptions::default().zero_volts);

    let events = bench.events();
    assert!(matches!(events.first(), Some(SimEvent::Line(Line::Enable, false))));
    assert_eq!(events.last(), Some(&SimEvent::MotorClosed));
}

#[test]
fn closed_motor_rejects_commands() {
    let (bench, _clock) = bench();
    let (_, mut motor) = bench.split();
    motor.close().unwrap();
    let err = motor.write_line(Line::Direction, true).unwrap_err();
    assert!(err.to_string().contains("closed"));
}

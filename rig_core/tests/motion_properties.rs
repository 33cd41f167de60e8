//! Travel integration of the open-loop motion estimator.

use proptest::prelude::*;
use rig_core::{Direction, Mechanics, MotionEstimator};
use std::time::Duration;

fn step() -> impl Strategy<Value = (Direction, f64, u64)> {
    let dir = prop_oneof![
        Just(Direction::Forward),
        Just(Direction::Reverse),
        Just(Direction::Stop)
    ];
    let hz = prop_oneof![Just(0.0), 1.0f64..10_000.0];
    (dir, hz, 0u64..500)
}

proptest! {
    #[test]
    fn travel_is_running_sum_of_commanded_pulses(steps in prop::collection::vec(step(), 0..64)) {
        let tpp = Mechanics::default().travel_per_pulse_in();
        let mut est = MotionEstimator::new(tpp);
        let mut expected = 0.0f64;
        for (dir, hz, ms) in steps {
            est.set_command(dir, hz);
            let dt = Duration::from_millis(ms);
            expected += dir.sign() * hz * dt.as_secs_f64() * tpp;
            let travel = est.tick(dt);
            prop_assert!((travel - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn stopped_or_zero_rate_ticks_add_nothing(ms in 0u64..10_000, hz in 0.0f64..10_000.0) {
        let mut est = MotionEstimator::new(0.001);
        est.set_command(Direction::Forward, 100.0);
        let before = est.tick(Duration::from_millis(250));

        est.set_command(Direction::Stop, hz);
        prop_assert_eq!(est.tick(Duration::from_millis(ms)), before);
        est.set_command(Direction::Reverse, 0.0);
        prop_assert_eq!(est.tick(Duration::from_millis(ms)), before);
    }
}

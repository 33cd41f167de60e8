//! Open-loop travel estimation from commanded step pulses.
//!
//! There is no position feedback on the rig: travel is the integral of the
//! commanded pulse rate over time, signed by the commanded direction, times the
//! linear distance one pulse moves the crosshead.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Commanded motor direction. `Forward` drives the direction line high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Direction {
    Reverse,
    #[default]
    Stop,
    Forward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Reverse => -1.0,
            Direction::Stop => 0.0,
            Direction::Forward => 1.0,
        }
    }

    /// Level of the direction line for this direction.
    pub fn line_level(self) -> bool {
        matches!(self, Direction::Forward)
    }
}

/// Drive-train geometry: motor, microstepping driver, gearbox, belt, lead screw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mechanics {
    pub motor_full_steps: u32,
    pub microstep: u32,
    pub gear_ratio: f64,
    pub pulley_ratio: f64,
    pub screw_pitch_mm: f64,
}

impl Default for Mechanics {
    fn default() -> Self {
        Self {
            motor_full_steps: 200,
            microstep: 8,
            gear_ratio: 15.0,
            pulley_ratio: 34.0 / 24.0,
            screw_pitch_mm: 5.0,
        }
    }
}

impl Mechanics {
    pub const MM_PER_INCH: f64 = 25.4;

    /// Step pulses per lead-screw input revolution (before the belt stage).
    pub fn pulses_per_rev(&self) -> f64 {
        f64::from(self.motor_full_steps) * f64::from(self.microstep) * self.gear_ratio
    }

    /// Inches of crosshead travel per step pulse.
    pub fn travel_per_pulse_in(&self) -> f64 {
        let pitch_in = self.screw_pitch_mm / Self::MM_PER_INCH;
        self.pulley_ratio * pitch_in / self.pulses_per_rev()
    }
}

/// Integrates the current motor command into an accumulated pulse count.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEstimator {
    direction: Direction,
    frequency_hz: f64,
    accumulated_pulses: f64,
    travel_per_pulse_in: f64,
}

impl MotionEstimator {
    pub fn new(travel_per_pulse_in: f64) -> Self {
        Self {
            direction: Direction::Stop,
            frequency_hz: 0.0,
            accumulated_pulses: 0.0,
            travel_per_pulse_in,
        }
    }

    pub fn from_mechanics(m: &Mechanics) -> Self {
        Self::new(m.travel_per_pulse_in())
    }

    /// Replace the current command. Negative or non-finite rates are treated as zero.
    pub fn set_command(&mut self, direction: Direction, frequency_hz: f64) {
        self.direction = direction;
        self.frequency_hz = if frequency_hz.is_finite() && frequency_hz > 0.0 {
            frequency_hz
        } else {
            0.0
        };
    }

    /// Advance by `dt` under the current command and return the new travel in inches.
    pub fn tick(&mut self, dt: Duration) -> f64 {
        if self.is_moving() {
            self.accumulated_pulses += self.direction.sign() * self.frequency_hz * dt.as_secs_f64();
        }
        self.travel_in()
    }

    pub fn travel_in(&self) -> f64 {
        self.accumulated_pulses * self.travel_per_pulse_in
    }

    pub fn is_moving(&self) -> bool {
        self.direction != Direction::Stop && self.frequency_hz > 0.0
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn accumulated_pulses(&self) -> f64 {
        self.accumulated_pulses
    }

    pub fn travel_per_pulse_in(&self) -> f64 {
        self.travel_per_pulse_in
    }
}

/// Estimator shared between the jog context (writes commands) and the sampler (ticks).
pub type SharedMotion = Arc<Mutex<MotionEstimator>>;

pub fn shared(estimator: MotionEstimator) -> SharedMotion {
    Arc::new(Mutex::new(estimator))
}

/// Lock the shared estimator. The state is plain numbers, so a poisoned lock is still usable.
pub fn lock(motion: &SharedMotion) -> MutexGuard<'_, MotionEstimator> {
    motion.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mechanics_travel_per_pulse() {
        let m = Mechanics::default();
        let expected = (34.0 / 24.0) * (5.0 / 25.4) / 24_000.0;
        assert!((m.travel_per_pulse_in() - expected).abs() < 1e-15);
    }

    #[test]
    fn stop_does_not_accumulate() {
        let mut e = MotionEstimator::new(0.001);
        e.set_command(Direction::Stop, 8000.0);
        assert_eq!(e.tick(Duration::from_secs(1)), 0.0);
        e.set_command(Direction::Forward, 0.0);
        assert_eq!(e.tick(Duration::from_secs(1)), 0.0);
        assert_eq!(e.accumulated_pulses(), 0.0);
    }

    #[test]
    fn forward_then_reverse_returns_home() {
        let mut e = MotionEstimator::new(0.5);
        e.set_command(Direction::Forward, 100.0);
        e.tick(Duration::from_millis(250));
        assert!((e.travel_in() - 12.5).abs() < 1e-12);
        e.set_command(Direction::Reverse, 100.0);
        e.tick(Duration::from_millis(250));
        assert!(e.travel_in().abs() < 1e-12);
    }

    #[test]
    fn negative_frequency_is_ignored() {
        let mut e = MotionEstimator::new(1.0);
        e.set_command(Direction::Forward, -5.0);
        assert!(!e.is_moving());
        e.set_command(Direction::Forward, f64::NAN);
        assert_eq!(e.frequency_hz(), 0.0);
    }
}

//! Load-cell force conversion, re-zeroing, and display smoothing.

use crate::error::{RigError, Result};
use crate::hw_error::map_sensor_error;
use rig_traits::AnalogInput;
use rig_traits::clock::Clock;
use std::collections::VecDeque;
use std::time::Duration;

/// Linear volts-to-force model of the load-cell channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceCalibration {
    /// Volts read at no load; updated by re-zeroing.
    pub zero_offset_volts: f64,
    /// Volts at full-scale load.
    pub v_full_scale: f64,
    /// Load at full-scale volts, in pounds.
    pub load_full_scale: f64,
    /// Empirical correction multiplier.
    pub cal_factor: f64,
}

impl Default for ForceCalibration {
    fn default() -> Self {
        Self {
            zero_offset_volts: 0.0,
            v_full_scale: 10.0,
            load_full_scale: 1000.0,
            cal_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForceChannel {
    cal: ForceCalibration,
}

impl ForceChannel {
    pub fn new(cal: ForceCalibration) -> Self {
        Self { cal }
    }

    pub fn calibration(&self) -> &ForceCalibration {
        &self.cal
    }

    pub fn zero_offset_volts(&self) -> f64 {
        self.cal.zero_offset_volts
    }

    /// `((volts - zero) / v_full_scale) * load_full_scale * cal_factor`
    pub fn compute_force(&self, volts: f64) -> f64 {
        let c = &self.cal;
        ((volts - c.zero_offset_volts) / c.v_full_scale) * c.load_full_scale * c.cal_factor
    }

    /// Single analog read, mapped to a sensor error on failure.
    pub fn read_volts<A: AnalogInput + ?Sized>(input: &mut A) -> Result<f64> {
        input
            .read_volts()
            .map_err(|e| eyre::Report::new(map_sensor_error(&*e)))
    }

    /// Average `samples` fresh reads and adopt the mean as the new zero offset.
    ///
    /// On any read failure the previous offset is kept and the error is returned.
    pub fn rezero<A: AnalogInput + ?Sized>(
        &mut self,
        input: &mut A,
        samples: usize,
        spacing: Duration,
        clock: &dyn Clock,
    ) -> Result<f64> {
        if samples == 0 {
            return Err(eyre::Report::new(RigError::InvalidInput(
                "zero sample count must be >= 1".into(),
            )));
        }
        let mut sum = 0.0;
        for i in 0..samples {
            if i > 0 && !spacing.is_zero() {
                clock.sleep(spacing);
            }
            sum += Self::read_volts(input)?;
        }
        let offset = sum / samples as f64;
        self.cal.zero_offset_volts = offset;
        tracing::info!(zero_offset_volts = offset, samples, "force channel re-zeroed");
        Ok(offset)
    }
}

/// Moving average over the last `window` values. A window of 1 passes values through.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, v: f64) -> f64 {
        if self.buf.len() == self.window
            && let Some(old) = self.buf.pop_front()
        {
            self.sum -= old;
        }
        self.buf.push_back(v);
        self.sum += v;
        self.sum / self.buf.len() as f64
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.sum = 0.0;
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

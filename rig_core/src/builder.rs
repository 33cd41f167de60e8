//! Assembles a [`Rig`] (station plus jog controller) from hardware and settings.

use std::sync::Arc;

use rig_traits::clock::{Clock, MonotonicClock};
use rig_traits::{AnalogInput, MotorLines};

use crate::error::{BuildError, Result};
use crate::export::ExportSettings;
use crate::force::{ForceCalibration, ForceChannel};
use crate::graph::AxisPolicy;
use crate::jog::{JogController, JogSpeeds};
use crate::motion::{self, Mechanics, MotionEstimator};
use crate::station::{Station, StationCfg, TestMode};

/// A ready-to-run rig. Both halves share one motion estimator.
pub struct Rig<A: AnalogInput, M: MotorLines> {
    pub station: Station<A>,
    pub jog: JogController<M>,
}

impl<A: AnalogInput, M: MotorLines> Rig<A, M> {
    pub fn builder() -> RigBuilder<A, M> {
        RigBuilder::new()
    }

    /// Mandatory startup sequence: blocking re-zero, then enable the driver.
    ///
    /// A re-zero failure here is fatal and the driver stays disabled.
    pub fn startup(&mut self) -> Result<f64> {
        let offset = self.station.rezero()?;
        self.jog.enable_driver()?;
        Ok(offset)
    }

    pub fn into_parts(self) -> (Station<A>, JogController<M>) {
        (self.station, self.jog)
    }
}

/// Builder for [`Rig`]. Hardware is required; every setting has a default.
pub struct RigBuilder<A, M> {
    analog: Option<A>,
    motor: Option<M>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    force: ForceCalibration,
    station: StationCfg,
    mechanics: Mechanics,
    speeds: JogSpeeds,
    enable_active_low: bool,
    axis: AxisPolicy,
    mode: TestMode,
    export: ExportSettings,
}

impl<A: AnalogInput, M: MotorLines> RigBuilder<A, M> {
    pub fn new() -> Self {
        Self {
            analog: None,
            motor: None,
            clock: None,
            force: ForceCalibration::default(),
            station: StationCfg::default(),
            mechanics: Mechanics::default(),
            speeds: JogSpeeds::default(),
            enable_active_low: true,
            axis: AxisPolicy::default(),
            mode: TestMode::default(),
            export: ExportSettings::default(),
        }
    }

    /// Take every setting from a loaded config file.
    pub fn with_config(self, cfg: &rig_config::Config) -> Self {
        Self {
            force: cfg.into(),
            station: cfg.into(),
            mechanics: (&cfg.mechanics).into(),
            speeds: (&cfg.jog).into(),
            enable_active_low: cfg.daq.enable_active_low,
            axis: (&cfg.graph).into(),
            export: cfg.into(),
            ..self
        }
    }

    pub fn with_analog(mut self, analog: A) -> Self {
        self.analog = Some(analog);
        self
    }

    pub fn with_motor(mut self, motor: M) -> Self {
        self.motor = Some(motor);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_force(mut self, force: ForceCalibration) -> Self {
        self.force = force;
        self
    }

    pub fn with_station(mut self, station: StationCfg) -> Self {
        self.station = station;
        self
    }

    pub fn with_mechanics(mut self, mechanics: Mechanics) -> Self {
        self.mechanics = mechanics;
        self
    }

    pub fn with_speeds(mut self, speeds: JogSpeeds) -> Self {
        self.speeds = speeds;
        self
    }

    pub fn with_enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    pub fn with_axis(mut self, axis: AxisPolicy) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_mode(mut self, mode: TestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_export(mut self, export: ExportSettings) -> Self {
        self.export = export;
        self
    }

    fn check(&self) -> std::result::Result<(), BuildError> {
        if self.station.interval.is_zero() {
            return Err(BuildError::InvalidConfig("sampling interval must be > 0"));
        }
        if self.station.zero_samples == 0 {
            return Err(BuildError::InvalidConfig("zero sample count must be >= 1"));
        }
        if !(self.force.v_full_scale.is_finite() && self.force.v_full_scale > 0.0) {
            return Err(BuildError::InvalidConfig("v_full_scale must be > 0"));
        }
        if !(self.force.cal_factor.is_finite() && self.force.cal_factor != 0.0) {
            return Err(BuildError::InvalidConfig("cal_factor must be finite and non-zero"));
        }
        let tpp = self.mechanics.travel_per_pulse_in();
        if !(tpp.is_finite() && tpp > 0.0) {
            return Err(BuildError::InvalidConfig("travel per pulse must be finite and > 0"));
        }
        if !(self.speeds.slow_hz > 0.0 && self.speeds.fast_hz > 0.0) {
            return Err(BuildError::InvalidConfig("jog rates must be > 0"));
        }
        if !(self.speeds.duty_cycle > 0.0 && self.speeds.duty_cycle < 1.0) {
            return Err(BuildError::InvalidConfig("duty cycle must be in (0, 1)"));
        }
        Ok(())
    }

    pub fn try_build(self) -> std::result::Result<Rig<A, M>, BuildError> {
        self.check()?;
        let analog = self.analog.ok_or(BuildError::MissingAnalog)?;
        let motor = self.motor.ok_or(BuildError::MissingMotor)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let shared = motion::shared(MotionEstimator::from_mechanics(&self.mechanics));
        let station = Station::new(
            analog,
            ForceChannel::new(self.force),
            shared.clone(),
            clock,
            self.station,
        )
        .with_axis(self.axis)
        .with_mode(self.mode)
        .with_export(self.export);
        let jog = JogController::new(motor, shared, self.speeds, self.enable_active_low);
        Ok(Rig { station, jog })
    }

    pub fn build(self) -> Result<Rig<A, M>> {
        Ok(self.try_build()?)
    }
}

impl<A: AnalogInput, M: MotorLines> Default for RigBuilder<A, M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingLines, ScriptedAnalog};

    #[test]
    fn missing_hardware_is_reported() {
        let r = Rig::<ScriptedAnalog, RecordingLines>::builder()
            .with_motor(RecordingLines::new())
            .try_build();
        assert!(matches!(r, Err(BuildError::MissingAnalog)));
        let r = Rig::<ScriptedAnalog, RecordingLines>::builder()
            .with_analog(ScriptedAnalog::new([0.0]))
            .try_build();
        assert!(matches!(r, Err(BuildError::MissingMotor)));
    }

    #[test]
    fn zero_cal_factor_is_rejected() {
        let r = Rig::builder()
            .with_analog(ScriptedAnalog::new([0.0]))
            .with_motor(RecordingLines::new())
            .with_force(ForceCalibration {
                cal_factor: 0.0,
                ..ForceCalibration::default()
            })
            .try_build();
        assert!(matches!(r, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn config_file_values_flow_through() {
        let cfg = rig_config::load_toml(
            "[sampling]\ninterval_ms = 40\n[graph]\naxis_mode = \"fixed_xy\"\nymax = 250.0\n",
        )
        .unwrap();
        let rig = Rig::builder()
            .with_config(&cfg)
            .with_analog(ScriptedAnalog::new([0.0]))
            .with_motor(RecordingLines::new())
            .build()
            .unwrap();
        assert_eq!(rig.station.interval(), std::time::Duration::from_millis(40));
        assert_eq!(rig.station.axis().mode, crate::graph::AxisMode::FixedXY);
        assert_eq!(rig.station.axis().bounds.ymax, 250.0);
    }
}

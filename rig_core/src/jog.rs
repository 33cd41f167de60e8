//! Jog state machine driving the step/direction/enable lines.
//!
//! At most one pulse generator is live at any time. Every path that stops the
//! motor releases that generator before anything else touches the lines.

use crate::error::{RigError, Result};
use crate::hw_error::map_hw_error;
use crate::motion::{self, Direction, SharedMotion};
use rig_traits::{Level, Line, MotorLines, PulseHandle, PulseSpec};

/// Jog speed selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedTier {
    Fast,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogCommand {
    Stop,
    Move(Direction, SpeedTier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JogState {
    #[default]
    Idle,
    Moving {
        direction: Direction,
        tier: SpeedTier,
    },
}

/// Pulse rates for each tier plus the generator duty cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogSpeeds {
    pub fast_hz: f64,
    pub slow_hz: f64,
    pub duty_cycle: f64,
}

impl Default for JogSpeeds {
    fn default() -> Self {
        Self {
            fast_hz: 8000.0,
            slow_hz: 1200.0,
            duty_cycle: 0.5,
        }
    }
}

impl JogSpeeds {
    pub fn hz(&self, tier: SpeedTier) -> f64 {
        match tier {
            SpeedTier::Fast => self.fast_hz,
            SpeedTier::Slow => self.slow_hz,
        }
    }
}

pub struct JogController<M: MotorLines> {
    lines: M,
    motion: SharedMotion,
    speeds: JogSpeeds,
    enable_active_low: bool,
    pulse: Option<PulseHandle>,
    generator_hz: f64,
    state: JogState,
    shut_down: bool,
}

impl<M: MotorLines> JogController<M> {
    pub fn new(lines: M, motion: SharedMotion, speeds: JogSpeeds, enable_active_low: bool) -> Self {
        Self {
            lines,
            motion,
            speeds,
            enable_active_low,
            pulse: None,
            generator_hz: 0.0,
            state: JogState::Idle,
            shut_down: false,
        }
    }

    pub fn state(&self) -> JogState {
        self.state
    }

    /// Rate the live generator was started at, or 0 when none is running.
    pub fn generator_hz(&self) -> f64 {
        self.generator_hz
    }

    pub fn has_generator(&self) -> bool {
        self.pulse.is_some()
    }

    pub fn motion(&self) -> SharedMotion {
        self.motion.clone()
    }

    fn enable_level(&self, enabled: bool) -> bool {
        // Active-low drivers enable on a low line.
        enabled != self.enable_active_low
    }

    /// Drive the enable line to its active level.
    pub fn enable_driver(&mut self) -> Result<()> {
        self.ensure_open()?;
        let level = self.enable_level(true);
        self.lines
            .write_line(Line::Enable, level)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        tracing::info!(active_low = self.enable_active_low, "motor driver enabled");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shut_down {
            return Err(eyre::Report::new(RigError::State(
                "jog controller is shut down".into(),
            )));
        }
        Ok(())
    }

    pub fn apply(&mut self, cmd: JogCommand) -> Result<JogState> {
        self.ensure_open()?;
        match cmd {
            JogCommand::Stop | JogCommand::Move(Direction::Stop, _) => {
                self.stop()?;
            }
            JogCommand::Move(direction, tier) => {
                if let Err(e) = self.start_move(direction, tier) {
                    return Err(self.force_stop(e));
                }
            }
        }
        Ok(self.state)
    }

    fn start_move(&mut self, direction: Direction, tier: SpeedTier) -> std::result::Result<(), RigError> {
        let hz = self.speeds.hz(tier);
        motion::lock(&self.motion).set_command(direction, hz);
        self.lines
            .write_line(Line::Direction, direction.line_level())
            .map_err(|e| map_hw_error(&*e))?;
        if self.pulse.is_none() {
            let spec = PulseSpec {
                frequency_hz: hz,
                duty_cycle: self.speeds.duty_cycle,
                idle_level: Level::Low,
            };
            let handle = self.lines.start_pulses(spec).map_err(|e| map_hw_error(&*e))?;
            self.pulse = Some(handle);
            self.generator_hz = hz;
        } else if hz != self.generator_hz {
            // The running generator keeps its start rate; only the estimate follows the new tier.
            tracing::debug!(
                generator_hz = self.generator_hz,
                estimator_hz = hz,
                "generator already running, rate unchanged"
            );
        }
        let next = JogState::Moving { direction, tier };
        if next != self.state {
            tracing::debug!(?direction, ?tier, "jog move");
        }
        self.state = next;
        Ok(())
    }

    /// After a failed hardware command: best-effort stop, then report.
    fn force_stop(&mut self, cause: RigError) -> eyre::Report {
        tracing::warn!(error = %cause, "hardware command failed, forcing stop");
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "stop after hardware failure also failed");
        }
        eyre::Report::new(cause).wrap_err("jog command failed; motor stopped")
    }

    /// Release the generator and zero the motion command.
    pub fn stop(&mut self) -> Result<()> {
        motion::lock(&self.motion).set_command(Direction::Stop, 0.0);
        if self.state != JogState::Idle {
            tracing::debug!("jog stop");
        }
        self.state = JogState::Idle;
        if let Some(handle) = self.pulse.take() {
            self.generator_hz = 0.0;
            self.lines
                .stop_and_release(handle)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        }
        Ok(())
    }

    /// Release the generator, disable the driver, close the lines. In that order, best-effort.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "releasing pulse generator failed");
        }
        let level = self.enable_level(false);
        if let Err(e) = self.lines.write_line(Line::Enable, level) {
            tracing::warn!(error = %e, "disabling motor driver failed");
        }
        if let Err(e) = self.lines.close() {
            tracing::warn!(error = %e, "closing motor lines failed");
        }
        tracing::info!("motor driver disabled");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl<M: MotorLines> Drop for JogController<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

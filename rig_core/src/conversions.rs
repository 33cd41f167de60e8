//! `From` implementations bridging `rig_config` types to `rig_core` types.

use crate::export::ExportSettings;
use crate::force::ForceCalibration;
use crate::graph::{AxisBounds, AxisMode, AxisPolicy};
use crate::jog::JogSpeeds;
use crate::motion::Mechanics;
use crate::runner::{RunMode, RunParams};
use crate::station::StationCfg;
use std::time::Duration;

// ── Force ────────────────────────────────────────────────────────────────────

impl From<&rig_config::Config> for ForceCalibration {
    /// Zero offset starts at 0 V; the startup re-zero sets it.
    fn from(c: &rig_config::Config) -> Self {
        Self {
            zero_offset_volts: 0.0,
            v_full_scale: c.force.v_full_scale,
            load_full_scale: c.force.load_full_scale,
            cal_factor: c.effective_cal_factor(),
        }
    }
}

impl From<&rig_config::Config> for StationCfg {
    fn from(c: &rig_config::Config) -> Self {
        Self {
            interval: Duration::from_millis(c.sampling.interval_ms),
            zero_samples: c.force.zero_samples,
            zero_spacing: Duration::from_millis(c.force.zero_spacing_ms),
            ma_window: c.force.ma_window,
            max_points: c.graph.max_points,
            keep_points: c.graph.keep_points,
        }
    }
}

// ── Motion ───────────────────────────────────────────────────────────────────

impl From<&rig_config::MechanicsCfg> for Mechanics {
    fn from(c: &rig_config::MechanicsCfg) -> Self {
        Self {
            motor_full_steps: c.motor_full_steps,
            microstep: c.microstep,
            gear_ratio: c.gear_ratio,
            pulley_ratio: c.pulley_ratio,
            screw_pitch_mm: c.screw_pitch_mm,
        }
    }
}

impl From<&rig_config::JogCfg> for JogSpeeds {
    fn from(c: &rig_config::JogCfg) -> Self {
        Self {
            fast_hz: c.fast_hz,
            slow_hz: c.slow_hz,
            duty_cycle: c.duty_cycle,
        }
    }
}

// ── Graph / export ───────────────────────────────────────────────────────────

impl From<rig_config::AxisModeCfg> for AxisMode {
    fn from(m: rig_config::AxisModeCfg) -> Self {
        match m {
            rig_config::AxisModeCfg::AutoXy => AxisMode::AutoXY,
            rig_config::AxisModeCfg::FixedXy => AxisMode::FixedXY,
            rig_config::AxisModeCfg::AutoXFixedY => AxisMode::AutoXFixedY,
            rig_config::AxisModeCfg::FixedXAutoY => AxisMode::FixedXAutoY,
        }
    }
}

impl From<&rig_config::GraphCfg> for AxisPolicy {
    fn from(c: &rig_config::GraphCfg) -> Self {
        Self {
            mode: c.axis_mode.into(),
            bounds: AxisBounds {
                xmin: c.xmin,
                xmax: c.xmax,
                ymin: c.ymin,
                ymax: c.ymax,
            },
        }
    }
}

impl From<&rig_config::Config> for ExportSettings {
    fn from(c: &rig_config::Config) -> Self {
        Self {
            dir: c.export_dir(),
            csv: c.export.csv,
            png: c.export.png,
        }
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

impl From<rig_config::RunMode> for RunMode {
    fn from(m: rig_config::RunMode) -> Self {
        match m {
            rig_config::RunMode::Cooperative => RunMode::Cooperative,
            rig_config::RunMode::Threaded => RunMode::Threaded,
        }
    }
}

impl From<&rig_config::RunnerCfg> for RunParams {
    fn from(c: &rig_config::RunnerCfg) -> Self {
        Self {
            mode: c.mode.into(),
            join_timeout: Duration::from_millis(c.join_timeout_ms),
            jog_poll: Duration::from_millis(c.jog_poll_ms),
            max_ticks: None,
        }
    }
}

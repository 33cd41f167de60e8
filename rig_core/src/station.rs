//! The sampling side of the rig: force channel, travel estimate, live graph, recording.

use crate::error::{Report, Result, RigError};
use crate::events::{Frame, MotionSnapshot, Notice, OperatorEvent, Presenter};
use crate::export::{self, ChartRenderer, ExportReport, ExportSettings};
use crate::force::{ForceChannel, MovingAverage};
use crate::graph::{AxisPolicy, GraphSeries};
use crate::motion::{self, SharedMotion};
use crate::recorder::{self, ForceQuery, TestRecorder};
use rig_traits::AnalogInput;
use rig_traits::clock::Clock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sign convention for relative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TestMode {
    #[default]
    Compression,
    Tension,
}

impl TestMode {
    pub fn sign(self) -> f64 {
        match self {
            TestMode::Compression => -1.0,
            TestMode::Tension => 1.0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TestMode::Compression => TestMode::Tension,
            TestMode::Tension => TestMode::Compression,
        }
    }
}

/// One tick's values. Absolute values are sign-adjusted; relative ones are against the graph origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub volts: f64,
    pub raw_force: f64,
    pub travel_in: f64,
    pub abs_force: f64,
    pub abs_travel: f64,
    pub rel_force: f64,
    pub rel_travel: f64,
    pub dt_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationCfg {
    pub interval: Duration,
    pub zero_samples: usize,
    pub zero_spacing: Duration,
    pub ma_window: usize,
    pub max_points: usize,
    pub keep_points: usize,
}

impl Default for StationCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            zero_samples: 50,
            zero_spacing: Duration::ZERO,
            ma_window: 1,
            max_points: 0,
            keep_points: 2000,
        }
    }
}

pub struct Station<A: AnalogInput> {
    analog: A,
    clock: Arc<dyn Clock + Send + Sync>,
    force: ForceChannel,
    smoothing: MovingAverage,
    motion: SharedMotion,
    graph: GraphSeries,
    recorder: TestRecorder,
    axis: AxisPolicy,
    mode: TestMode,
    cfg: StationCfg,
    export: ExportSettings,
    last_tick: Option<Instant>,
    last: Reading,
    closed: bool,
}

impl<A: AnalogInput> Station<A> {
    pub fn new(
        analog: A,
        force: ForceChannel,
        motion: SharedMotion,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: StationCfg,
    ) -> Self {
        Self {
            analog,
            clock,
            force,
            smoothing: MovingAverage::new(cfg.ma_window),
            motion,
            graph: GraphSeries::with_cap(cfg.max_points, cfg.keep_points),
            recorder: TestRecorder::new(),
            axis: AxisPolicy::default(),
            mode: TestMode::default(),
            cfg,
            export: ExportSettings::default(),
            last_tick: None,
            last: Reading::default(),
            closed: false,
        }
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

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    pub fn interval(&self) -> Duration {
        self.cfg.interval
    }

    pub fn tick(&mut self) -> Result<Reading> {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Read, convert, integrate travel, and append to the graph and any active recording.
    ///
    /// The first tick integrates over the nominal interval. A failed read is fatal.
    pub fn tick_at(&mut self, now: Instant) -> Result<Reading> {
        let volts = ForceChannel::read_volts(&mut self.analog)?;
        let raw_force = self.force.compute_force(self.smoothing.push(volts));

        let dt = match self.last_tick {
            Some(prev) => now.saturating_duration_since(prev),
            None => self.cfg.interval,
        };
        self.last_tick = Some(now);
        let travel_in = motion::lock(&self.motion).tick(dt);

        let sign = self.mode.sign();
        let abs_force = sign * raw_force;
        let abs_travel = sign * travel_in;
        let rel_force = sign * (raw_force - self.graph.force_offset());
        let rel_travel = sign * (travel_in - self.graph.travel_offset());

        self.recorder.record(now, rel_travel, rel_force);
        self.graph.push(rel_travel, rel_force);

        self.last = Reading {
            volts,
            raw_force,
            travel_in,
            abs_force,
            abs_travel,
            rel_force,
            rel_travel,
            dt_s: dt.as_secs_f64(),
        };
        tracing::trace!(volts, raw_force, travel_in, "tick");
        Ok(self.last)
    }

    /// Re-zero the force channel. On failure nothing changes.
    pub fn rezero(&mut self) -> Result<f64> {
        let offset = self.force.rezero(
            &mut self.analog,
            self.cfg.zero_samples,
            self.cfg.zero_spacing,
            self.clock.as_ref(),
        )?;
        self.smoothing.clear();
        self.graph.clear_force_offset();
        self.last.raw_force = 0.0;
        self.last.abs_force = 0.0;
        self.last.rel_force = 0.0;
        Ok(offset)
    }

    /// Clear the graph and rebase travel at the current estimate.
    pub fn reset_graph(&mut self) {
        let travel = motion::lock(&self.motion).travel_in();
        self.graph.reset(travel);
        self.last.rel_travel = 0.0;
        tracing::info!(travel_offset = travel, "graph reset");
    }

    /// Reset the graph, then start a fresh recording.
    pub fn start_test(&mut self) {
        self.reset_graph();
        let now = self.clock.now();
        self.recorder.start(now);
        tracing::info!(mode = ?self.mode, "test started");
    }

    pub fn end_test(&mut self) -> std::result::Result<usize, RigError> {
        let rows = self.recorder.stop()?;
        tracing::info!(rows, "test ended");
        Ok(rows)
    }

    pub fn set_mode(&mut self, mode: TestMode) {
        self.mode = mode;
        tracing::info!(?mode, "test mode set");
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    pub fn set_axis(&mut self, axis: AxisPolicy) {
        self.axis = axis;
    }

    pub fn axis(&self) -> AxisPolicy {
        self.axis
    }

    pub fn set_export_dir(&mut self, dir: PathBuf) {
        self.export.dir = dir;
    }

    pub fn export_settings(&self) -> &ExportSettings {
        &self.export
    }

    pub fn query_force_at_travel(&self, target: &str) -> ForceQuery {
        recorder::query_force_at_travel(&self.graph, target)
    }

    pub fn export(
        &self,
        renderer: Option<&mut (dyn ChartRenderer + '_)>,
    ) -> std::result::Result<ExportReport, RigError> {
        export::export_results(
            &self.recorder,
            &self.graph,
            self.axis.resolve(&self.graph),
            &self.export,
            renderer,
            export::unix_timestamp(),
        )
    }

    pub fn graph(&self) -> &GraphSeries {
        &self.graph
    }

    pub fn recorder(&self) -> &TestRecorder {
        &self.recorder
    }

    pub fn last_reading(&self) -> &Reading {
        &self.last
    }

    pub fn force_channel(&self) -> &ForceChannel {
        &self.force
    }

    pub fn motion(&self) -> SharedMotion {
        self.motion.clone()
    }

    pub fn frame(&self) -> Frame<'_> {
        let (direction, frequency_hz) = {
            let m = motion::lock(&self.motion);
            (m.direction(), m.frequency_hz())
        };
        Frame {
            reading: &self.last,
            graph: &self.graph,
            bounds: self.axis.resolve(&self.graph),
            axis_mode: self.axis.mode,
            mode: self.mode,
            test_active: self.recorder.is_active(),
            motion: MotionSnapshot {
                direction,
                frequency_hz,
            },
        }
    }

    /// Apply a non-jog operator request and report the outcome to `presenter`.
    ///
    /// Jog commands, `Rezero`, and `Quit` are owned by the caller and ignored here.
    pub fn handle_event(
        &mut self,
        event: OperatorEvent,
        presenter: &mut dyn Presenter,
        renderer: Option<&mut (dyn ChartRenderer + '_)>,
    ) {
        match event {
            OperatorEvent::StartTest => {
                self.start_test();
                presenter.notice(&Notice::Info("test started".into()));
            }
            OperatorEvent::EndTest => match self.end_test() {
                Ok(rows) => presenter.notice(&Notice::Info(format!("test ended, {rows} samples"))),
                Err(e) => presenter.notice(&Notice::from_error(&e)),
            },
            OperatorEvent::ResetGraph => self.reset_graph(),
            OperatorEvent::SetTestMode(mode) => self.set_mode(mode),
            OperatorEvent::ToggleTestMode => self.set_mode(self.mode.toggled()),
            OperatorEvent::ConfigureAxis { mode, bounds } => {
                let text = [
                    bounds[0].as_str(),
                    bounds[1].as_str(),
                    bounds[2].as_str(),
                    bounds[3].as_str(),
                ];
                match AxisPolicy::parse(mode, text, self.axis.bounds) {
                    Ok(p) => self.set_axis(p),
                    Err(e) => presenter.notice(&Notice::from_error(&e)),
                }
            }
            OperatorEvent::QueryForceAtTravel(target) => {
                let result = self.query_force_at_travel(&target);
                presenter.notice(&Notice::ForceAtTravel { target, result });
            }
            OperatorEvent::Export => match self.export(renderer) {
                Ok(report) => {
                    for p in report.written() {
                        presenter.notice(&Notice::Exported(p.to_path_buf()));
                    }
                    for e in report.failures() {
                        presenter.notice(&Notice::from_error(e));
                    }
                }
                Err(e) => presenter.notice(&Notice::from_error(&e)),
            },
            OperatorEvent::SetExportDir(dir) => self.set_export_dir(dir),
            OperatorEvent::Jog(_) | OperatorEvent::Rezero | OperatorEvent::Quit => {}
        }
    }

    /// Re-zero on operator request. Failure is reported, not fatal.
    pub fn handle_rezero(&mut self, presenter: &mut dyn Presenter) {
        match self.rezero() {
            Ok(v) => presenter.notice(&Notice::Info(format!("zeroed at {v:.4} V"))),
            Err(e) => {
                tracing::warn!(error = %e, "re-zero failed");
                presenter.notice(&Notice::from_report(&e));
            }
        }
    }

    /// Release the analog input. Safe to call more than once.
    pub fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        if let Err(e) = self.analog.close() {
            tracing::warn!(error = %e, "closing analog input failed");
        }
    }
}

impl<A: AnalogInput> Drop for Station<A> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a fatal tick failure to the notice shown before the loop ends.
pub fn sensor_failure_notice(e: &Report) -> Notice {
    Notice::Error(format!("sampling stopped: {e:#}"))
}

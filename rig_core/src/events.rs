//! Operator requests, notices, and the presentation seam.

use crate::error::{Report, RigError};
use crate::graph::{AxisMode, GraphSeries, ViewBounds};
use crate::jog::JogCommand;
use crate::motion::Direction;
use crate::recorder::ForceQuery;
use crate::station::{Reading, TestMode};
use std::path::PathBuf;

/// Requests produced by the operator surface.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorEvent {
    Jog(JogCommand),
    Rezero,
    StartTest,
    EndTest,
    ResetGraph,
    SetTestMode(TestMode),
    ToggleTestMode,
    /// Axis mode plus bound text in `xmin, xmax, ymin, ymax` order.
    ConfigureAxis {
        mode: AxisMode,
        bounds: [String; 4],
    },
    QueryForceAtTravel(String),
    Export,
    SetExportDir(PathBuf),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
    ForceAtTravel { target: String, result: ForceQuery },
    Exported(PathBuf),
}

impl Notice {
    pub fn from_error(e: &RigError) -> Self {
        if e.is_warning() {
            Notice::Warning(e.to_string())
        } else {
            Notice::Error(e.to_string())
        }
    }

    pub fn from_report(r: &Report) -> Self {
        match crate::error::rig_error(r) {
            Some(e) if e.is_warning() => Notice::Warning(format!("{r:#}")),
            _ => Notice::Error(format!("{r:#}")),
        }
    }
}

/// Motor command as seen by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSnapshot {
    pub direction: Direction,
    pub frequency_hz: f64,
}

/// Everything a presenter needs for one refresh.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub reading: &'a Reading,
    pub graph: &'a GraphSeries,
    pub bounds: ViewBounds,
    pub axis_mode: AxisMode,
    pub mode: TestMode,
    pub test_active: bool,
    pub motion: MotionSnapshot,
}

/// Presentation sink. Called only from the sampling context.
pub trait Presenter {
    fn frame(&mut self, frame: &Frame<'_>);
    fn notice(&mut self, notice: &Notice);
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn frame(&mut self, frame: &Frame<'_>) {
        (**self).frame(frame);
    }
    fn notice(&mut self, notice: &Notice) {
        (**self).notice(notice);
    }
}

/// Presenter that keeps notices and counts frames.
#[derive(Debug, Default)]
pub struct CollectingPresenter {
    pub frames: usize,
    pub last_reading: Option<Reading>,
    pub notices: Vec<Notice>,
}

impl Presenter for CollectingPresenter {
    fn frame(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        self.last_reading = Some(*frame.reading);
    }
    fn notice(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

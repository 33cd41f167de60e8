#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core logic of the load-frame test rig (hardware-agnostic).
//!
//! All hardware interaction goes through `rig_traits::AnalogInput` and
//! `rig_traits::MotorLines`.
//!
//! ## Architecture
//!
//! - **Force**: volts-to-force model, re-zeroing, smoothing (`force`)
//! - **Motion**: open-loop travel estimate from commanded pulses (`motion`)
//! - **Jog**: operator-driven motor state machine, one live generator max (`jog`)
//! - **Station**: per-tick sampling, live graph, test recording (`station`, `graph`, `recorder`)
//! - **Export**: CSV and chart artifacts of a finished test (`export`)
//! - **Runner**: cooperative or two-thread orchestration until shutdown (`runner`)
//!
//! Travel is in inches, force in pounds, time in seconds.

pub mod builder;
pub mod conversions;
pub mod error;
pub mod events;
pub mod export;
pub mod force;
pub mod graph;
pub mod hw_error;
pub mod jog;
pub mod mocks;
pub mod motion;
pub mod recorder;
pub mod runner;
pub mod signal;
pub mod station;

pub use builder::{Rig, RigBuilder};
pub use error::{BuildError, Report, Result, RigError};
pub use events::{Frame, MotionSnapshot, Notice, OperatorEvent, Presenter};
pub use export::{ChartRenderer, ExportReport, ExportSettings};
pub use force::{ForceCalibration, ForceChannel, MovingAverage};
pub use graph::{AxisBounds, AxisMode, AxisPolicy, GraphSeries, ViewBounds};
pub use jog::{JogCommand, JogController, JogSpeeds, JogState, SpeedTier};
pub use motion::{Direction, Mechanics, MotionEstimator, SharedMotion};
pub use recorder::{ForceQuery, TestRecorder, query_force_at_travel};
pub use runner::{ExitReason, RunMode, RunParams, RunSummary, run, run_jog_only};
pub use signal::Signal;
pub use station::{Reading, Station, StationCfg, TestMode};

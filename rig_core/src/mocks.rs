//! Scripted hardware doubles for tests and benches.

use rig_traits::{AnalogInput, BoxError, Line, MotorLines, PulseHandle, PulseSpec};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Analog input that replays a fixed sequence of volts, repeating the last value.
#[derive(Debug, Clone)]
pub struct ScriptedAnalog {
    volts: VecDeque<f64>,
    last: f64,
    reads: u64,
    fail_after: Option<u64>,
    closed: bool,
}

impl ScriptedAnalog {
    pub fn new<I: IntoIterator<Item = f64>>(volts: I) -> Self {
        Self {
            volts: volts.into_iter().collect(),
            last: 0.0,
            reads: 0,
            fail_after: None,
            closed: false,
        }
    }

    /// Fail every read after `n` successful ones.
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl AnalogInput for ScriptedAnalog {
    fn read_volts(&mut self) -> Result<f64, BoxError> {
        if self.closed {
            return Err("analog input closed".into());
        }
        if self.fail_after.is_some_and(|n| self.reads >= n) {
            return Err("scripted analog failure".into());
        }
        self.reads += 1;
        if let Some(v) = self.volts.pop_front() {
            self.last = v;
        }
        Ok(self.last)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEvent {
    Write(Line, bool),
    Start { id: u64, frequency_hz: f64 },
    Release { id: u64 },
    Close,
}

#[derive(Debug, Default)]
struct LinesState {
    events: Vec<LineEvent>,
    live: usize,
    max_live: usize,
    starts: usize,
    next_id: u64,
    fail_next_start: bool,
    fail_writes: bool,
    fail_release: bool,
}

/// Motor lines that log every call. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingLines {
    state: Arc<Mutex<LinesState>>,
}

impl RecordingLines {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut LinesState) -> R) -> R {
        let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut s)
    }

    pub fn events(&self) -> Vec<LineEvent> {
        self.with(|s| s.events.clone())
    }

    /// Generators currently started and not yet released.
    pub fn live(&self) -> usize {
        self.with(|s| s.live)
    }

    pub fn max_live(&self) -> usize {
        self.with(|s| s.max_live)
    }

    pub fn starts(&self) -> usize {
        self.with(|s| s.starts)
    }

    pub fn fail_next_start(&self) {
        self.with(|s| s.fail_next_start = true);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.with(|s| s.fail_writes = fail);
    }

    pub fn fail_release(&self, fail: bool) {
        self.with(|s| s.fail_release = fail);
    }
}

impl MotorLines for RecordingLines {
    fn write_line(&mut self, line: Line, high: bool) -> Result<(), BoxError> {
        self.with(|s| {
            if s.fail_writes {
                return Err("scripted line write failure".into());
            }
            s.events.push(LineEvent::Write(line, high));
            Ok(())
        })
    }

    fn start_pulses(&mut self, spec: PulseSpec) -> Result<PulseHandle, BoxError> {
        self.with(|s| {
            if std::mem::take(&mut s.fail_next_start) {
                return Err("scripted pulse start failure".into());
            }
            s.next_id += 1;
            s.starts += 1;
            s.live += 1;
            s.max_live = s.max_live.max(s.live);
            s.events.push(LineEvent::Start {
                id: s.next_id,
                frequency_hz: spec.frequency_hz,
            });
            Ok(PulseHandle::new(s.next_id))
        })
    }

    fn stop_and_release(&mut self, handle: PulseHandle) -> Result<(), BoxError> {
        self.with(|s| {
            // The generator is gone either way; only the report differs.
            s.live = s.live.saturating_sub(1);
            s.events.push(LineEvent::Release { id: handle.id() });
            if s.fail_release {
                return Err("scripted release failure".into());
            }
            Ok(())
        })
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.with(|s| s.events.push(LineEvent::Close));
        Ok(())
    }
}

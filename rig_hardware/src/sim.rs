//! Simulated bench: a lead-screw stage pressing on a linear-elastic specimen.
//!
//! Both halves (`SimAnalog`, `SimMotor`) share one state behind a mutex, so
//! they can live on different threads. Position is integrated from the live
//! pulse generator and the direction line each time the state is touched.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use rig_traits::{AnalogInput, BoxError, Clock, Line, MonotonicClock, MotorLines, PulseHandle, PulseSpec};

use crate::error::HwError;

/// Observable motor-side operations, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Line(Line, bool),
    PulseStart { id: u64, frequency_hz: f64 },
    PulseRelease { id: u64 },
    MotorClosed,
    AnalogClosed,
}

#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Amplifier output with no load.
    pub zero_volts: f64,
    /// Volts per inch of specimen compression.
    pub volts_per_inch: f64,
    /// Free travel below the start position before the platen touches the specimen.
    pub contact_gap_in: f64,
    /// Stage travel per step pulse.
    pub travel_in_per_pulse: f64,
    /// Driver enable input is active-low.
    pub enable_active_low: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            zero_volts: 0.0125,
            volts_per_inch: 4.0,
            contact_gap_in: 0.05,
            // 34/24 pulley, 5 mm screw pitch, 200 * 8 * 15 pulses per rev
            travel_in_per_pulse: (34.0 / 24.0) * (5.0 / 25.4) / 24_000.0,
            enable_active_low: true,
        }
    }
}

#[derive(Debug)]
struct Generator {
    id: u64,
    frequency_hz: f64,
}

struct SimState {
    opts: SimOptions,
    clock: Arc<dyn Clock + Send + Sync>,
    last_update: Instant,
    position_pulses: f64,
    direction_high: bool,
    enable_high: bool,
    generator: Option<Generator>,
    next_id: u64,
    max_live: usize,
    reads: u64,
    fail_reads_after: Option<u64>,
    fail_next_pulse_start: bool,
    motor_closed: bool,
    analog_closed: bool,
    events: Vec<SimEvent>,
}

impl SimState {
    fn driver_enabled(&self) -> bool {
        if self.opts.enable_active_low {
            !self.enable_high
        } else {
            self.enable_high
        }
    }

    fn advance(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        if let Some(g) = &self.generator
            && self.driver_enabled()
        {
            let sign = if self.direction_high { 1.0 } else { -1.0 };
            self.position_pulses += sign * g.frequency_hz * dt;
        }
    }

    fn position_in(&self) -> f64 {
        self.position_pulses * self.opts.travel_in_per_pulse
    }

    fn volts(&self) -> f64 {
        // Moving down (negative travel) past the gap compresses the specimen;
        // the amplifier swings negative under compression.
        let depth = (-self.position_in() - self.opts.contact_gap_in).max(0.0);
        self.opts.zero_volts - self.opts.volts_per_inch * depth
    }
}

/// Shared simulated bench. Cheap to clone; all clones observe one state.
#[derive(Clone)]
pub struct SimBench {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimBench {
    fn default() -> Self {
        Self::new(SimOptions::default())
    }
}

impl SimBench {
    pub fn new(opts: SimOptions) -> Self {
        Self::with_clock(opts, Arc::new(MonotonicClock::new()))
    }

    /// Build a bench whose stage integrates time from `clock`.
    pub fn with_clock(opts: SimOptions, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last_update = clock.now();
        // The enable line powers up at the driver's disabled level.
        let enable_high = opts.enable_active_low;
        Self {
            state: Arc::new(Mutex::new(SimState {
                opts,
                clock,
                last_update,
                position_pulses: 0.0,
                direction_high: false,
                enable_high,
                generator: None,
                next_id: 1,
                max_live: 0,
                reads: 0,
                fail_reads_after: None,
                fail_next_pulse_start: false,
                motor_closed: false,
                analog_closed: false,
                events: Vec::new(),
            })),
        }
    }

    /// Split into the analog-input half and the motor-lines half.
    pub fn split(&self) -> (SimAnalog, SimMotor) {
        (
            SimAnalog {
                bench: self.clone(),
            },
            SimMotor {
                bench: self.clone(),
            },
        )
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicked holder cannot leave the plain-data state inconsistent.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Make every analog read after the first `n` fail.
    pub fn fail_reads_after(&self, n: u64) {
        self.lock().fail_reads_after = Some(n);
    }

    /// Make the next pulse-generator start fail once.
    pub fn fail_next_pulse_start(&self) {
        self.lock().fail_next_pulse_start = true;
    }

    pub fn position_in(&self) -> f64 {
        let mut s = self.lock();
        s.advance();
        s.position_in()
    }

    pub fn live_generators(&self) -> usize {
        usize::from(self.lock().generator.is_some())
    }

    /// Highest number of generators ever live at once.
    pub fn max_live_generators(&self) -> usize {
        self.lock().max_live
    }

    pub fn driver_enabled(&self) -> bool {
        self.lock().driver_enabled()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events.clone()
    }
}

/// Analog-input half of a `SimBench`.
pub struct SimAnalog {
    bench: SimBench,
}

impl AnalogInput for SimAnalog {
    fn read_volts(&mut self) -> Result<f64, BoxError> {
        let mut s = self.bench.lock();
        if s.analog_closed {
            return Err(Box::new(HwError::Closed));
        }
        s.reads += 1;
        if let Some(limit) = s.fail_reads_after
            && s.reads > limit
        {
            return Err(Box::new(HwError::AnalogRead(format!(
                "simulated sensor fault after {limit} reads"
            ))));
        }
        s.advance();
        let v = s.volts();
        tracing::trace!(volts = v, "sim analog sample");
        Ok(v)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let mut s = self.bench.lock();
        s.analog_closed = true;
        s.events.push(SimEvent::AnalogClosed);
        Ok(())
    }
}

/// Motor-lines half of a `SimBench`.
pub struct SimMotor {
    bench: SimBench,
}

impl MotorLines for SimMotor {
    fn write_line(&mut self, line: Line, high: bool) -> Result<(), BoxError> {
        let mut s = self.bench.lock();
        if s.motor_closed {
            return Err(Box::new(HwError::Closed));
        }
        s.advance();
        match line {
            Line::Direction => s.direction_high = high,
            Line::Enable => s.enable_high = high,
        }
        s.events.push(SimEvent::Line(line, high));
        Ok(())
    }

    fn start_pulses(&mut self, spec: PulseSpec) -> Result<PulseHandle, BoxError> {
        let mut s = self.bench.lock();
        if s.motor_closed {
            return Err(Box::new(HwError::Closed));
        }
        if std::mem::take(&mut s.fail_next_pulse_start) {
            return Err(Box::new(HwError::Pwm("simulated counter fault".into())));
        }
        if let Some(g) = &s.generator {
            return Err(Box::new(HwError::CounterBusy(g.id)));
        }
        s.advance();
        let id = s.next_id;
        s.next_id += 1;
        s.generator = Some(Generator {
            id,
            frequency_hz: spec.frequency_hz,
        });
        s.max_live = s.max_live.max(1);
        s.events.push(SimEvent::PulseStart {
            id,
            frequency_hz: spec.frequency_hz,
        });
        tracing::debug!(id, frequency_hz = spec.frequency_hz, "sim pulse train started");
        Ok(PulseHandle::new(id))
    }

    fn stop_and_release(&mut self, handle: PulseHandle) -> Result<(), BoxError> {
        let mut s = self.bench.lock();
        s.advance();
        let owned = s.generator.as_ref().is_some_and(|g| g.id == handle.id());
        if !owned {
            return Err(Box::new(HwError::UnknownHandle(handle.id())));
        }
        s.generator = None;
        s.events.push(SimEvent::PulseRelease { id: handle.id() });
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let mut s = self.bench.lock();
        s.motor_closed = true;
        s.events.push(SimEvent::MotorClosed);
        Ok(())
    }
}

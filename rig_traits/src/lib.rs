pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing the hardware seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Single-ended or differential analog input wired to the load-cell amplifier.
pub trait AnalogInput {
    /// Read one sample in volts.
    fn read_volts(&mut self) -> Result<f64, BoxError>;

    /// Release the channel. Called once during shutdown.
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Digital output lines of the stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    Direction,
    Enable,
}

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

/// Parameters of a continuous pulse train.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSpec {
    pub frequency_hz: f64,
    pub duty_cycle: f64,
    pub idle_level: Level,
}

/// Opaque handle to a running pulse generator.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PulseHandle(u64);

impl PulseHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait MotorLines {
    fn write_line(&mut self, line: Line, high: bool) -> Result<(), BoxError>;
    /// Program and start a continuous pulse train.
    fn start_pulses(&mut self, spec: PulseSpec) -> Result<PulseHandle, BoxError>;
    /// Stop the pulse train and release the counter. Consumes the handle.
    fn stop_and_release(&mut self, handle: PulseHandle) -> Result<(), BoxError>;
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn read_volts(&mut self) -> Result<f64, BoxError> {
        (**self).read_volts()
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: MotorLines + ?Sized> MotorLines for Box<T> {
    fn write_line(&mut self, line: Line, high: bool) -> Result<(), BoxError> {
        (**self).write_line(line, high)
    }
    fn start_pulses(&mut self, spec: PulseSpec) -> Result<PulseHandle, BoxError> {
        (**self).start_pulses(spec)
    }
    fn stop_and_release(&mut self, handle: PulseHandle) -> Result<(), BoxError> {
        (**self).stop_and_release(handle)
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("counter busy: a pulse generator is already running (handle {0})")]
    CounterBusy(u64),
    #[error("unknown pulse generator handle {0}")]
    UnknownHandle(u64),
    #[error("analog read failed: {0}")]
    AnalogRead(String),
    #[error("device closed")]
    Closed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

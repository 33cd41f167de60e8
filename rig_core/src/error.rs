use thiserror::Error;

/// Typed failures of the rig core, classified by recovery policy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigError {
    /// Analog read failed. Fatal to the sampling loop.
    #[error("sensor failure: {0}")]
    Sensor(String),
    /// Digital write or pulse-generator command failed. The motor is forced to Stop.
    #[error("hardware error: {0}")]
    Hardware(String),
    /// Operator entered something that is not a usable number.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Nothing to act on (empty series, no active test).
    #[error("no data: {0}")]
    NoData(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl RigError {
    /// Sensor failures end the sampling loop; everything else is reported and survived.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RigError::Sensor(_))
    }

    /// Input and no-data conditions are warnings rather than errors.
    pub fn is_warning(&self) -> bool {
        matches!(self, RigError::InvalidInput(_) | RigError::NoData(_))
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing analog input")]
    MissingAnalog,
    #[error("missing motor lines")]
    MissingMotor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Find the `RigError` carried by a report, looking through `wrap_err` context.
pub fn rig_error(report: &Report) -> Option<&RigError> {
    report.downcast_ref::<RigError>()
}

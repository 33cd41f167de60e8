//! Hardware backends for the test rig.
//!
//! The simulated bench is always available; the Raspberry Pi backend
//! (GPIO lines, hardware PWM step generator, SPI ADC) is behind the
//! `hardware` feature.
pub mod error;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod pi;

pub use sim::{SimAnalog, SimBench, SimEvent, SimMotor, SimOptions};

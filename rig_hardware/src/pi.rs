//! Raspberry Pi backend: GPIO direction/enable lines, a hardware PWM channel
//! as the continuous step-pulse generator, and an MCP3208 ADC on SPI0 for the
//! load-cell amplifier output.
use rppal::gpio::{Gpio, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::{debug, trace};

use rig_traits::{AnalogInput, BoxError, Level, Line, MotorLines, PulseHandle, PulseSpec};

use crate::error::{HwError, Result};

const ADC_FULL_SCALE: f64 = 4095.0;

pub struct PiMotorLines {
    dir: OutputPin,
    en: OutputPin,
    channel: Channel,
    pwm: Option<(u64, Pwm)>,
    next_id: u64,
}

impl PiMotorLines {
    /// `pwm_channel` 0 or 1 selects the hardware PWM output used for STEP.
    /// The enable pin starts at its disabled level for the given polarity.
    pub fn new(dir_pin: u8, en_pin: u8, pwm_channel: u8, enable_active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dir = gpio
            .get(dir_pin)
            .map_err(|e| HwError::Gpio(format!("dir pin {dir_pin}: {e}")))?
            .into_output_low();
        let en_pin = gpio
            .get(en_pin)
            .map_err(|e| HwError::Gpio(format!("enable pin {en_pin}: {e}")))?;
        let en = if enable_active_low {
            en_pin.into_output_high()
        } else {
            en_pin.into_output_low()
        };
        let channel = match pwm_channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("no PWM channel {other}"))),
        };
        Ok(Self {
            dir,
            en,
            channel,
            pwm: None,
            next_id: 1,
        })
    }
}

impl MotorLines for PiMotorLines {
    fn write_line(&mut self, line: Line, high: bool) -> std::result::Result<(), BoxError> {
        let pin = match line {
            Line::Direction => &mut self.dir,
            Line::Enable => &mut self.en,
        };
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        trace!(?line, high, "gpio write");
        Ok(())
    }

    fn start_pulses(&mut self, spec: PulseSpec) -> std::result::Result<PulseHandle, BoxError> {
        if let Some((id, _)) = &self.pwm {
            return Err(Box::new(HwError::CounterBusy(*id)));
        }
        let polarity = match spec.idle_level {
            Level::Low => Polarity::Normal,
            Level::High => Polarity::Inverse,
        };
        let pwm = Pwm::with_frequency(
            self.channel,
            spec.frequency_hz,
            spec.duty_cycle,
            polarity,
            true,
        )
        .map_err(|e| HwError::Pwm(e.to_string()))?;
        let id = self.next_id;
        self.next_id += 1;
        self.pwm = Some((id, pwm));
        debug!(id, frequency_hz = spec.frequency_hz, "pwm step train started");
        Ok(PulseHandle::new(id))
    }

    fn stop_and_release(&mut self, handle: PulseHandle) -> std::result::Result<(), BoxError> {
        match self.pwm.take() {
            Some((id, pwm)) if id == handle.id() => {
                pwm.disable().map_err(|e| HwError::Pwm(e.to_string()))?;
                debug!(id, "pwm step train released");
                Ok(())
            }
            other => {
                self.pwm = other;
                Err(Box::new(HwError::UnknownHandle(handle.id())))
            }
        }
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        if let Some((_, pwm)) = self.pwm.take() {
            pwm.disable().map_err(|e| HwError::Pwm(e.to_string()))?;
        }
        self.dir.set_low();
        Ok(())
    }
}

/// MCP3208 single-ended channel mapped linearly onto `[min_volts, max_volts]`.
pub struct PiAnalog {
    spi: Spi,
    channel: u8,
    min_volts: f64,
    max_volts: f64,
}

impl PiAnalog {
    pub fn new(channel: u8, min_volts: f64, max_volts: f64) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::Spi(format!("MCP3208 has no channel {channel}")));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self {
            spi,
            channel,
            min_volts,
            max_volts,
        })
    }
}

impl AnalogInput for PiAnalog {
    fn read_volts(&mut self) -> std::result::Result<f64, BoxError> {
        // Start bit, single-ended, 3-bit channel select straddling bytes 0/1.
        let tx = [0x06 | (self.channel >> 2), (self.channel & 0x03) << 6, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::AnalogRead(e.to_string()))?;
        let code = (u16::from(rx[1] & 0x0F) << 8) | u16::from(rx[2]);
        let volts = self.min_volts + (f64::from(code) / ADC_FULL_SCALE) * (self.max_volts - self.min_volts);
        trace!(code, volts, "mcp3208 sample");
        Ok(volts)
    }
}

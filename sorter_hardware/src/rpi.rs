//! Raspberry Pi backends (rppal): GPIO buttons, an MCP3008 on SPI0 for the
//! reflectance sensor, and hardware PWM for the flaps.

use std::time::Duration;

use rppal::gpio::{Gpio, InputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use sorter_traits::{AnalogSensor, ButtonInput, HwResult, ServoDriver};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

const SERVO_FRAME: Duration = Duration::from_millis(20);
const SPI_CLOCK_HZ: u32 = 1_000_000;

/// Active-low push button with the internal pull-up enabled.
pub struct GpioButton {
    pin: InputPin,
}

impl GpioButton {
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(format!("pin {bcm_pin}: {e}")))?
            .into_input_pullup();
        debug!(pin = bcm_pin, "button configured");
        Ok(Self { pin })
    }
}

impl ButtonInput for GpioButton {
    fn is_high(&mut self) -> HwResult<bool> {
        Ok(self.pin.is_high())
    }
}

/// MCP3008 10-bit ADC. Readings are scaled to 8 bits so the colour
/// thresholds work the same as on an 8-bit converter.
pub struct Mcp3008 {
    spi: Spi,
}

impl Mcp3008 {
    pub fn new() -> Result<Self> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self { spi })
    }
}

impl AnalogSensor for Mcp3008 {
    fn read_channel(&mut self, channel: u8) -> HwResult<u16> {
        if channel > 7 {
            return Err(HwError::InvalidChannel(channel).into());
        }
        // Start bit, single-ended mode + channel, then clock out the result.
        let tx = [0x01, (0x08 | channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        let raw = (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]);
        trace!(channel, raw, "mcp3008 sample");
        Ok(raw >> 2)
    }
}

/// Two flaps on the Pi's hardware PWM channels. Pulses are in microseconds.
pub struct PwmServo {
    channels: Vec<Pwm>,
}

impl PwmServo {
    /// `pwm_channels` lists the PWM channel (0 or 1) per lane.
    pub fn new(pwm_channels: &[u8], initial_pulse: u16) -> Result<Self> {
        let mut channels = Vec::with_capacity(pwm_channels.len());
        for &ch in pwm_channels {
            let channel = match ch {
                0 => Channel::Pwm0,
                1 => Channel::Pwm1,
                other => return Err(HwError::InvalidChannel(other)),
            };
            let pwm = Pwm::with_period(
                channel,
                SERVO_FRAME,
                Duration::from_micros(u64::from(initial_pulse)),
                Polarity::Normal,
                true,
            )
            .map_err(|e| HwError::Pwm(e.to_string()))?;
            channels.push(pwm);
        }
        Ok(Self { channels })
    }
}

impl ServoDriver for PwmServo {
    fn set_pulse(&mut self, index: u8, pulse: u16) -> HwResult<()> {
        let pwm = self
            .channels
            .get(usize::from(index))
            .ok_or(HwError::InvalidChannel(index))?;
        pwm.set_pulse_width(Duration::from_micros(u64::from(pulse)))
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        trace!(index, pulse, "servo pulse");
        Ok(())
    }
}

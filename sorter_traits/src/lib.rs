//! Hardware seams for the marble sorter.
//!
//! Every trait returns `Box<dyn Error + Send + Sync>` so backends can surface
//! their own error types; `sorter_core` maps them to its typed errors.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at every trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Analog front-end. Channel selection is the implementor's concern.
pub trait AnalogSensor {
    fn read_channel(&mut self, channel: u8) -> HwResult<u16>;
}

/// One momentary push button.
pub trait ButtonInput {
    /// Raw pin level; buttons are wired active-low so `true` means released.
    fn is_high(&mut self) -> HwResult<bool>;

    /// Convenience for the active-low wiring.
    fn is_pressed(&mut self) -> HwResult<bool> {
        self.is_high().map(|high| !high)
    }
}

/// PWM output driving one or more hobby servos.
pub trait ServoDriver {
    /// Set the on-time of servo `index` in PWM compare units.
    fn set_pulse(&mut self, index: u8, pulse: u16) -> HwResult<()>;
}

/// Byte-addressed persistent store (EEPROM-style).
///
/// A cell that was never written reads back as the store's sentinel value.
pub trait ByteStore {
    fn read_byte(&mut self, addr: u16) -> HwResult<u8>;
    fn write_byte(&mut self, addr: u16, value: u8) -> HwResult<()>;
}

impl<T: AnalogSensor + ?Sized> AnalogSensor for Box<T> {
    fn read_channel(&mut self, channel: u8) -> HwResult<u16> {
        (**self).read_channel(channel)
    }
}

impl<T: ButtonInput + ?Sized> ButtonInput for Box<T> {
    fn is_high(&mut self) -> HwResult<bool> {
        (**self).is_high()
    }
}

impl<T: ServoDriver + ?Sized> ServoDriver for Box<T> {
    fn set_pulse(&mut self, index: u8, pulse: u16) -> HwResult<()> {
        (**self).set_pulse(index, pulse)
    }
}

impl<T: ByteStore + ?Sized> ByteStore for Box<T> {
    fn read_byte(&mut self, addr: u16) -> HwResult<u8> {
        (**self).read_byte(addr)
    }
    fn write_byte(&mut self, addr: u16, value: u8) -> HwResult<()> {
        (**self).write_byte(addr, value)
    }
}

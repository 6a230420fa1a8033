//! Device backends for the marble sorter.
//!
//! The simulated devices are always available; the Raspberry Pi drivers need
//! the `hardware` feature on Linux.
pub mod eeprom;
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;
pub mod sim;

pub use eeprom::{FileEeprom, MemoryEeprom};
pub use error::HwError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use rpi::{GpioButton, Mcp3008, PwmServo};
pub use sim::{
    ButtonHandle, SimHopper, SimMarble, SimulatedButton, SimulatedSensor, SimulatedServo,
};

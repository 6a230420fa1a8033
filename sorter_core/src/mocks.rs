//! Test and helper mocks for sorter_core

use std::sync::{Arc, Mutex};

use sorter_traits::{ByteStore, HwResult, ServoDriver};

use crate::counts::SENTINEL;

/// Servo that accepts every pulse and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopServo;

impl ServoDriver for NoopServo {
    fn set_pulse(&mut self, _index: u8, _pulse: u16) -> HwResult<()> {
        Ok(())
    }
}

/// Servo that records `(index, pulse)` pairs; clones share the log.
#[derive(Debug, Default, Clone)]
pub struct LogServo {
    log: Arc<Mutex<Vec<(u8, u16)>>>,
}

impl LogServo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> Vec<(u8, u16)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ServoDriver for LogServo {
    fn set_pulse(&mut self, index: u8, pulse: u16) -> HwResult<()> {
        self.log
            .lock()
            .map_err(|_| std::io::Error::other("servo log poisoned"))?
            .push((index, pulse));
        Ok(())
    }
}

/// Erased 16-byte store. Counts writes so update-only behaviour is observable.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    bytes: [u8; 16],
    writes: usize,
    fail_writes: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            bytes: [SENTINEL; 16],
            writes: 0,
            fail_writes: false,
        }
    }

    /// A store whose every write fails.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    /// Set a byte without counting it as a write.
    pub fn poke(&mut self, addr: u16, value: u8) {
        if let Some(b) = self.bytes.get_mut(usize::from(addr)) {
            *b = value;
        }
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.bytes.get(usize::from(addr)).copied().unwrap_or(SENTINEL)
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ByteStore for MemoryStore {
    fn read_byte(&mut self, addr: u16) -> HwResult<u8> {
        self.bytes
            .get(usize::from(addr))
            .copied()
            .ok_or_else(|| format!("address {addr:#04x} out of range").into())
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> HwResult<()> {
        if self.fail_writes {
            return Err(std::io::Error::other("write rejected").into());
        }
        let slot = self
            .bytes
            .get_mut(usize::from(addr))
            .ok_or_else(|| format!("address {addr:#04x} out of range"))?;
        *slot = value;
        self.writes += 1;
        Ok(())
    }
}

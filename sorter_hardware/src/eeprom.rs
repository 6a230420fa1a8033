//! Byte-addressed non-volatile stores.
//!
//! Erased cells read as `0xFF`, like a blank EEPROM.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sorter_traits::{ByteStore, HwResult};

use crate::error::{HwError, Result};

pub const ERASED: u8 = 0xFF;

/// Default capacity: 256 cells, addresses `0x00..=0xFF`.
pub const DEFAULT_CAPACITY: usize = 256;

/// Volatile store for simulation and tests.
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    cells: Vec<u8>,
}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryEeprom {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![ERASED; capacity],
        }
    }

    fn index(&self, addr: u16) -> Result<usize> {
        let i = usize::from(addr);
        if i < self.cells.len() {
            Ok(i)
        } else {
            Err(HwError::Storage(format!(
                "address {addr:#04x} out of range (capacity {})",
                self.cells.len()
            )))
        }
    }
}

impl ByteStore for MemoryEeprom {
    fn read_byte(&mut self, addr: u16) -> HwResult<u8> {
        Ok(self.cells[self.index(addr)?])
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> HwResult<()> {
        let i = self.index(addr)?;
        self.cells[i] = value;
        Ok(())
    }
}

/// Store backed by a small image file; every write replaces the file
/// atomically, so a power cut leaves either the old or the new image.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    image: MemoryEeprom,
}

impl FileEeprom {
    /// Open `path`, treating a missing file as a blank device.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut image = MemoryEeprom::default();
        match fs::read(&path) {
            Ok(bytes) => {
                let n = bytes.len().min(image.cells.len());
                image.cells[..n].copy_from_slice(&bytes[..n]);
                tracing::debug!(path = %path.display(), bytes = n, "eeprom image loaded");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no eeprom image yet; starting blank");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self { path, image })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for FileEeprom {
    fn read_byte(&mut self, addr: u16) -> HwResult<u8> {
        self.image.read_byte(addr)
    }

    /// The cached image only changes once the file write succeeded, so a
    /// failed write is retried by the next caller that sees a stale byte.
    fn write_byte(&mut self, addr: u16, value: u8) -> HwResult<()> {
        let mut staged = self.image.clone();
        staged.write_byte(addr, value)?;
        write_atomic(&self.path, &staged.cells)?;
        self.image = staged;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_read_erased() {
        let mut m = MemoryEeprom::new(4);
        assert_eq!(m.read_byte(3).unwrap(), ERASED);
        m.write_byte(3, 7).unwrap();
        assert_eq!(m.read_byte(3).unwrap(), 7);
        assert!(m.read_byte(4).is_err());
        assert!(m.write_byte(4, 1).is_err());
    }
}

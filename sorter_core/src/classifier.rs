//! Raw analog reading -> marble colour.

use crate::config::SensorCfg;
use crate::types::MarbleType;

/// Fixed threshold bands over the reflectance reading.
///
/// `reading <= white` is White, `white < reading <= black` is Black, anything
/// brighter is an empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorClassifier {
    white: u16,
    black: u16,
}

impl SensorClassifier {
    pub fn new(white_threshold: u16, black_threshold: u16) -> Self {
        Self {
            white: white_threshold,
            black: black_threshold,
        }
    }

    /// Classify one reading. The flag is `true` when no marble is present.
    #[inline]
    pub fn classify(&self, raw: u16) -> (MarbleType, bool) {
        if raw <= self.white {
            (MarbleType::White, false)
        } else if raw <= self.black {
            (MarbleType::Black, false)
        } else {
            (MarbleType::None, true)
        }
    }

    pub fn white_threshold(&self) -> u16 {
        self.white
    }

    pub fn black_threshold(&self) -> u16 {
        self.black
    }
}

impl From<&SensorCfg> for SensorClassifier {
    fn from(c: &SensorCfg) -> Self {
        Self::new(c.white_threshold, c.black_threshold)
    }
}

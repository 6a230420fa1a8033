//! Maps `Box<dyn Error>` from trait boundaries to typed `SorterError`.
//!
//! The traits in `sorter_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `sorter_hardware::HwError` downcasting.

use crate::error::SorterError;

/// Map a trait-boundary error to a typed `SorterError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SorterError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<sorter_hardware::error::HwError>() {
            return match hw {
                sorter_hardware::error::HwError::Storage(msg) => SorterError::Storage(msg.clone()),
                sorter_hardware::error::HwError::Io(io) => SorterError::Storage(io.to_string()),
                other => SorterError::HardwareFault(other.to_string()),
            };
        }
    }

    SorterError::Hardware(e.to_string())
}

/// Same as [`map_hw_error`] but classifies everything as a storage failure.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> SorterError {
    match map_hw_error(e) {
        SorterError::Hardware(msg) | SorterError::HardwareFault(msg) => SorterError::Storage(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_map_to_hardware() {
        let e = std::io::Error::other("bus glitch");
        assert_eq!(map_hw_error(&e), SorterError::Hardware("bus glitch".into()));
    }

    #[test]
    fn store_errors_are_classified_as_storage() {
        let e = std::io::Error::other("eeprom busy");
        assert_eq!(map_store_error(&e), SorterError::Storage("eeprom busy".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_are_downcast() {
        use sorter_hardware::error::HwError;
        let e = HwError::Storage("cell 0x02".into());
        assert_eq!(map_hw_error(&e), SorterError::Storage("cell 0x02".into()));
        let e = HwError::InvalidChannel(9);
        assert!(matches!(map_hw_error(&e), SorterError::HardwareFault(m) if m.contains('9')));
    }
}

//! Human-readable error descriptions, structured JSON errors and exit codes.

use sorter_core::error::{BuildError, SorterError};
use sorter_hardware::HwError;

/// Exit code for configuration problems.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for device and storage failures.
pub const EXIT_HARDWARE: i32 = 3;

fn find<E: std::error::Error + 'static>(err: &eyre::Report) -> Option<&E> {
    err.chain().find_map(|e| e.downcast_ref::<E>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingServo => {
                "What happened: No servo driver was provided to the sorter.\nLikely causes: The PWM backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the servo is created successfully and passed via with_servo(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No statistics store was provided to the sorter.\nLikely causes: The EEPROM image could not be opened.\nHow to fix: Check [storage] path in the config and its directory permissions.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/sorter.toml for a sample."
            ),
        };
    }

    if let Some(se) = find::<SorterError>(err) {
        return match se {
            SorterError::Config(msg) => format!(
                "What happened: Configuration could not be loaded ({msg}).\nLikely causes: Missing file, TOML syntax error, unknown section, or a rejected value.\nHow to fix: Pass --config <FILE> or fix the reported key."
            ),
            SorterError::Storage(msg) => format!(
                "What happened: Statistics storage failed ({msg}).\nLikely causes: Unwritable [storage] path or a full disk.\nHow to fix: Check the path and permissions; sorting continues without persistence."
            ),
            SorterError::Hardware(msg) | SorterError::HardwareFault(msg) => format!(
                "What happened: A device reported an error ({msg}).\nLikely causes: Wiring, power, or missing GPIO/SPI/PWM permissions.\nHow to fix: Check [pins] in the config and run `sorter self-check`."
            ),
            SorterError::InvalidAngle(deg) => format!(
                "What happened: A servo was asked for {deg} degrees.\nLikely causes: Internal routing error.\nHow to fix: Re-run with --log-level=debug and report the log."
            ),
            SorterError::PulseOutOfRange { degrees, counts } => format!(
                "What happened: The servo pulse for {degrees} degrees is {counts} counts, which the PWM register cannot hold.\nLikely causes: [servo] period_counts or an extreme offset is out of range.\nHow to fix: Restore the [servo] values from etc/sorter.toml."
            ),
            SorterError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug for more detail."
            ),
        };
    }

    if let Some(hw) = find::<HwError>(err) {
        return format!(
            "What happened: Device initialization failed ({hw}).\nLikely causes: Incorrect pin/channel numbers or insufficient permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access GPIO, SPI and PWM."
        );
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// 2 for configuration, 3 for hardware/storage, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if find::<BuildError>(err).is_some() {
        return EXIT_CONFIG;
    }
    if let Some(se) = find::<SorterError>(err) {
        return match se {
            SorterError::Config(_) => EXIT_CONFIG,
            SorterError::Hardware(_) | SorterError::HardwareFault(_) | SorterError::Storage(_) => {
                EXIT_HARDWARE
            }
            _ => 1,
        };
    }
    if find::<HwError>(err).is_some() {
        return EXIT_HARDWARE;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        EXIT_CONFIG => "Config",
        EXIT_HARDWARE => "Hardware",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn config_errors_exit_with_two() {
        let err: eyre::Report = Err::<(), _>(SorterError::Config("bad".into()))
            .wrap_err("load config")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        assert!(humanize(&err).contains("Configuration could not be loaded"));
    }

    #[test]
    fn device_errors_exit_with_three() {
        let err = eyre::Report::new(HwError::Gpio("pin 6 busy".into()));
        assert_eq!(exit_code_for_error(&err), EXIT_HARDWARE);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Hardware");
        assert_eq!(v["exit_code"], 3);
    }

    #[test]
    fn unknown_errors_are_generic() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
    }
}

#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the marble sorter.
//!
//! - `Config` and its sections are deserialized from TOML; every section is
//!   optional and defaults to the stock machine.
//! - `Config::validate` rejects values the runtime cannot honour.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    /// Start/stop button GPIO (BCM numbering, active-low).
    pub start_stop_btn: u8,
    /// Reset button GPIO (BCM numbering, active-low).
    pub reset_btn: u8,
    /// PWM channel driving the lane 0 flap.
    pub servo_pwm_0: u8,
    /// PWM channel driving the lane 1 flap.
    pub servo_pwm_1: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            start_stop_btn: 6,
            reset_btn: 7,
            servo_pwm_0: 0,
            servo_pwm_1: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    pub white_threshold: u16,
    pub black_threshold: u16,
    /// Lanes classified per sort cycle: 1 or 2.
    pub lanes: u8,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            white_threshold: 8,
            black_threshold: 20,
            lanes: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ButtonCfg {
    pub press_ms: u64,
    pub hold_ms: u64,
}

impl Default for ButtonCfg {
    fn default() -> Self {
        Self {
            press_ms: 100,
            hold_ms: 700,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PresenceCfg {
    /// Sustained absence (ms) before the hopper is reported empty.
    pub absence_ms: u64,
}

impl Default for PresenceCfg {
    fn default() -> Self {
        Self { absence_ms: 80 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    pub fast_tick_us: u64,
    pub pacer_tick_ms: u64,
    /// Pacer ticks per sort cycle.
    pub sort_every_ticks: u32,
    /// Pacer ticks per elapsed second.
    pub quanta_per_second: u32,
    /// Pacer ticks per watchdog check.
    pub watchdog_ticks: u32,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            fast_tick_us: 1_000,
            pacer_tick_ms: 10,
            sort_every_ticks: 100,
            quanta_per_second: 100,
            watchdog_ticks: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServoCfg {
    /// PWM period in timer counts (20 ms frame).
    pub period_counts: u32,
    /// Correction at exactly 0 degrees.
    pub min_offset: i32,
    /// Correction at exactly 180 degrees.
    pub max_offset: i32,
    pub dwell_ms: u64,
}

impl Default for ServoCfg {
    fn default() -> Self {
        Self {
            period_counts: 40_000,
            min_offset: -700,
            max_offset: 550,
            dwell_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SortCfg {
    /// Total count at which a watchdog exit counts as a success.
    pub success_threshold: u32,
}

impl Default for SortCfg {
    fn default() -> Self {
        Self {
            success_threshold: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StorageCfg {
    /// File backing the statistics; in-memory when absent.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pins: Pins,
    pub sensor: SensorCfg,
    pub buttons: ButtonCfg,
    pub presence: PresenceCfg,
    pub timing: TimingCfg,
    pub servo: ServoCfg,
    pub sort: SortCfg,
    pub storage: StorageCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))
}

/// Compare value the sorter drives for `deg` (same formula as the runtime mapper).
fn servo_counts(period_counts: u32, deg: f64, offset: i32) -> i64 {
    let on_time = ((deg / 180.0) + 1.0) / 20.0 * f64::from(period_counts);
    (on_time + f64::from(offset)) as i64 >> 1
}

const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.white_threshold >= self.sensor.black_threshold {
            eyre::bail!(
                "sensor.white_threshold ({}) must be below sensor.black_threshold ({})",
                self.sensor.white_threshold,
                self.sensor.black_threshold
            );
        }
        if !(1..=2).contains(&self.sensor.lanes) {
            eyre::bail!("sensor.lanes must be 1 or 2");
        }

        // Buttons
        if self.buttons.press_ms == 0 {
            eyre::bail!("buttons.press_ms must be > 0");
        }
        if self.buttons.hold_ms <= self.buttons.press_ms {
            eyre::bail!("buttons.hold_ms must be greater than buttons.press_ms");
        }

        // Presence
        if self.presence.absence_ms == 0 {
            eyre::bail!("presence.absence_ms must be > 0");
        }

        // Timing
        if self.timing.fast_tick_us == 0 {
            eyre::bail!("timing.fast_tick_us must be > 0");
        }
        if self.timing.pacer_tick_ms == 0 {
            eyre::bail!("timing.pacer_tick_ms must be > 0");
        }
        if self.timing.sort_every_ticks == 0 {
            eyre::bail!("timing.sort_every_ticks must be > 0");
        }
        if self.timing.quanta_per_second == 0 {
            eyre::bail!("timing.quanta_per_second must be > 0");
        }
        if self.timing.watchdog_ticks == 0 {
            eyre::bail!("timing.watchdog_ticks must be > 0");
        }

        // Servo
        if self.servo.period_counts == 0 {
            eyre::bail!("servo.period_counts must be > 0");
        }
        for (deg, offset) in [
            (0.0, self.servo.min_offset),
            (90.0, 0),
            (180.0, self.servo.max_offset),
        ] {
            let counts = servo_counts(self.servo.period_counts, deg, offset);
            if !(0..=i64::from(u16::MAX)).contains(&counts) {
                eyre::bail!(
                    "servo pulse at {deg} degrees is {counts} counts; adjust servo.period_counts/min_offset/max_offset to stay within 0..=65535"
                );
            }
        }
        if self.servo.dwell_ms > 10_000 {
            eyre::bail!("servo.dwell_ms is unreasonably large (>10s)");
        }

        // Pins
        if self.pins.start_stop_btn == self.pins.reset_btn {
            eyre::bail!("pins.start_stop_btn and pins.reset_btn must differ");
        }
        if self.sensor.lanes == 2 && self.pins.servo_pwm_0 == self.pins.servo_pwm_1 {
            eyre::bail!("pins.servo_pwm_0 and pins.servo_pwm_1 must differ when sorting two lanes");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !ROTATIONS.contains(&rot)
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_the_stock_machine() {
        let cfg = load_toml("").unwrap();
        assert_eq!(cfg.sensor.white_threshold, 8);
        assert_eq!(cfg.sensor.black_threshold, 20);
        assert_eq!(cfg.timing.watchdog_ticks, 200);
        assert_eq!(cfg.servo.min_offset, -700);
        assert_eq!(cfg.sort.success_threshold, 10);
        assert!(cfg.storage.path.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let cfg = load_toml("[buttons]\nhold_ms = 900\n").unwrap();
        assert_eq!(cfg.buttons.press_ms, 100);
        assert_eq!(cfg.buttons.hold_ms, 900);
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(load_toml("[motor]\nspeed = 3\n").is_err());
    }
}

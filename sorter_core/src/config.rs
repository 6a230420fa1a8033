//! Runtime configuration for the sorter core.
//!
//! These are the structs consumed by `Sorter`, `InputSampler` and `Pacer`.
//! They are separate from the TOML-deserialized config in `sorter_config`;
//! `conversions` bridges the two.

use std::time::Duration;

/// Analog threshold bands and lane count.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Readings at or below this value are White.
    pub white_threshold: u16,
    /// Readings above `white_threshold` and at or below this are Black.
    pub black_threshold: u16,
    /// Lanes classified per sort cycle (1 or 2).
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

/// Button duration thresholds.
#[derive(Debug, Clone)]
pub struct ButtonCfg {
    /// Minimum pressed duration for a Press.
    pub press_ms: u64,
    /// Minimum pressed duration for a Hold.
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

/// Sustained-absence filter.
#[derive(Debug, Clone)]
pub struct PresenceCfg {
    /// Consecutive "no marble" time before the hopper counts as empty.
    pub absence_ms: u64,
}

impl Default for PresenceCfg {
    fn default() -> Self {
        Self { absence_ms: 80 }
    }
}

/// Tick periods and pacer dividers.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    /// Fast sampler period (buttons, presence).
    pub fast_tick: Duration,
    /// Pacer period.
    pub pacer_tick: Duration,
    /// Pacer ticks between sort cycles.
    pub sort_every_ticks: u32,
    /// Pacer ticks per elapsed second.
    pub quanta_per_second: u32,
    /// Pacer ticks between watchdog checks.
    pub watchdog_ticks: u32,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            fast_tick: Duration::from_millis(1),
            pacer_tick: Duration::from_millis(10),
            sort_every_ticks: 100,
            quanta_per_second: 100,
            watchdog_ticks: 200,
        }
    }
}

/// Servo pulse mapping.
#[derive(Debug, Clone)]
pub struct ServoCfg {
    /// PWM period in timer counts (20 ms frame).
    pub period_counts: u32,
    /// Correction applied at exactly 0 degrees.
    pub min_offset: i32,
    /// Correction applied at exactly 180 degrees.
    pub max_offset: i32,
    /// How long the flap stays deflected before returning to neutral.
    pub dwell: Duration,
}

impl Default for ServoCfg {
    fn default() -> Self {
        Self {
            period_counts: 40_000,
            min_offset: -700,
            max_offset: 550,
            dwell: Duration::from_millis(500),
        }
    }
}

/// Run outcome policy.
#[derive(Debug, Clone)]
pub struct SortCfg {
    /// Total count at which a watchdog exit still counts as a success.
    pub success_threshold: u32,
}

impl Default for SortCfg {
    fn default() -> Self {
        Self {
            success_threshold: 10,
        }
    }
}

/// Everything the sorter needs, bundled for the builder.
#[derive(Debug, Clone, Default)]
pub struct SorterCfg {
    pub sensor: SensorCfg,
    pub buttons: ButtonCfg,
    pub presence: PresenceCfg,
    pub timing: TimingCfg,
    pub servo: ServoCfg,
    pub sort: SortCfg,
}

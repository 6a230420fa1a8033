//! `From` implementations bridging `sorter_config` types to `sorter_core` types.

use std::time::Duration;

use crate::config::{
    ButtonCfg, PresenceCfg, SensorCfg, ServoCfg, SortCfg, SorterCfg, TimingCfg,
};

// ── SensorCfg ────────────────────────────────────────────────────────────────

impl From<&sorter_config::SensorCfg> for SensorCfg {
    fn from(c: &sorter_config::SensorCfg) -> Self {
        Self {
            white_threshold: c.white_threshold,
            black_threshold: c.black_threshold,
            lanes: c.lanes,
        }
    }
}

// ── ButtonCfg / PresenceCfg ──────────────────────────────────────────────────

impl From<&sorter_config::ButtonCfg> for ButtonCfg {
    fn from(c: &sorter_config::ButtonCfg) -> Self {
        Self {
            press_ms: c.press_ms,
            hold_ms: c.hold_ms,
        }
    }
}

impl From<&sorter_config::PresenceCfg> for PresenceCfg {
    fn from(c: &sorter_config::PresenceCfg) -> Self {
        Self {
            absence_ms: c.absence_ms,
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&sorter_config::TimingCfg> for TimingCfg {
    fn from(c: &sorter_config::TimingCfg) -> Self {
        Self {
            fast_tick: Duration::from_micros(c.fast_tick_us),
            pacer_tick: Duration::from_millis(c.pacer_tick_ms),
            sort_every_ticks: c.sort_every_ticks,
            quanta_per_second: c.quanta_per_second,
            watchdog_ticks: c.watchdog_ticks,
        }
    }
}

// ── ServoCfg / SortCfg ───────────────────────────────────────────────────────

impl From<&sorter_config::ServoCfg> for ServoCfg {
    fn from(c: &sorter_config::ServoCfg) -> Self {
        Self {
            period_counts: c.period_counts,
            min_offset: c.min_offset,
            max_offset: c.max_offset,
            dwell: Duration::from_millis(c.dwell_ms),
        }
    }
}

impl From<&sorter_config::SortCfg> for SortCfg {
    fn from(c: &sorter_config::SortCfg) -> Self {
        Self {
            success_threshold: c.success_threshold,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&sorter_config::Config> for SorterCfg {
    fn from(c: &sorter_config::Config) -> Self {
        Self {
            sensor: (&c.sensor).into(),
            buttons: (&c.buttons).into(),
            presence: (&c.presence).into(),
            timing: (&c.timing).into(),
            servo: (&c.servo).into(),
            sort: (&c.sort).into(),
        }
    }
}

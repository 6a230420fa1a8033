//! Per-tick work of the two periodic sources.
//!
//! Both are plain functions over `&Signals` so they can be driven
//! deterministically from tests; `ticker` puts them on threads.

use crate::button::ButtonClassifier;
use crate::classifier::SensorClassifier;
use crate::config::{SorterCfg, TimingCfg};
use crate::presence::PresenceDebouncer;
use crate::signals::Signals;
use crate::types::{ButtonId, SorterState};

/// One fast-tick sample of every raw input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInputs {
    /// Per-lane analog reading; `None` when the read failed.
    pub readings: [Option<u16>; 2],
    pub start_stop_pressed: bool,
    pub reset_pressed: bool,
}

/// Fast tick: buttons and hopper presence.
#[derive(Debug, Clone)]
pub struct InputSampler {
    classifier: SensorClassifier,
    presence: PresenceDebouncer,
    start_stop: ButtonClassifier,
    reset: ButtonClassifier,
}

impl InputSampler {
    pub fn new(cfg: &SorterCfg) -> Self {
        let tick = cfg.timing.fast_tick;
        Self {
            classifier: SensorClassifier::from(&cfg.sensor),
            presence: PresenceDebouncer::from_cfg(&cfg.presence, tick),
            start_stop: ButtonClassifier::from_cfg(&cfg.buttons, tick),
            reset: ButtonClassifier::from_cfg(&cfg.buttons, tick),
        }
    }

    /// Assemble from parts; mostly for tests that want tick-exact thresholds.
    pub fn from_parts(
        classifier: SensorClassifier,
        presence: PresenceDebouncer,
        start_stop: ButtonClassifier,
        reset: ButtonClassifier,
    ) -> Self {
        Self {
            classifier,
            presence,
            start_stop,
            reset,
        }
    }

    pub fn tick(&mut self, raw: RawInputs, signals: &Signals) {
        for (lane, reading) in raw.readings.iter().enumerate() {
            if let Some(r) = reading {
                signals.store_reading(lane, *r);
            }
        }

        // Presence is sensed on lane 0 only. A failed read holds the last state.
        match raw.readings[0] {
            Some(r) => {
                let (_, no_marble) = self.classifier.classify(r);
                signals.set_more_marbles(self.presence.observe(no_marble));
            }
            None => tracing::trace!("sensor read skipped"),
        }

        let start = self.start_stop.tick(raw.start_stop_pressed);
        let reset = self.reset.tick(raw.reset_pressed);
        signals.publish_action(ButtonId::StartStop, start);
        signals.publish_action(ButtonId::Reset, reset);
        signals.set_buttons_idle(!(self.start_stop.is_down() || self.reset.is_down()));
    }

    pub fn has_more_marbles(&self) -> bool {
        self.presence.has_more_marbles()
    }
}

/// Slow tick: sort pacing, elapsed-time quanta and the absence watchdog.
#[derive(Debug, Clone)]
pub struct Pacer {
    sort_every: u32,
    watchdog_every: u32,
    sort_count: u32,
    watchdog_count: u32,
}

impl Pacer {
    pub fn new(cfg: &TimingCfg) -> Self {
        Self {
            sort_every: cfg.sort_every_ticks.max(1),
            watchdog_every: cfg.watchdog_ticks.max(1),
            sort_count: 0,
            watchdog_count: 0,
        }
    }

    pub fn tick(&mut self, signals: &Signals) {
        let sorting = signals.state() == SorterState::Sort;

        self.sort_count += 1;
        self.watchdog_count += 1;

        if sorting {
            signals.add_time_quantum();
        }

        if self.watchdog_count >= self.watchdog_every {
            self.watchdog_count = 0;
            // Only an empty hopper during Sort trips the watchdog; a stall
            // with marbles still present never does.
            if sorting && !signals.more_marbles() {
                tracing::trace!("watchdog raised");
                signals.raise_watchdog();
            }
        }

        if self.sort_count >= self.sort_every {
            self.sort_count = 0;
            signals.raise_pace();
        }
    }
}

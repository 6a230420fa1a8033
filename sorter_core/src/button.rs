//! Press/hold classification for one active-low button.
//!
//! The classifier lives on the fast tick thread and only counts; the result of
//! a release is published into `Signals`, which owns the readiness gate and
//! the single-consumption slot.

use std::time::Duration;

use crate::config::ButtonCfg;
use crate::types::ButtonAction;
use crate::util::ticks_for_ms;

#[derive(Debug, Clone)]
pub struct ButtonClassifier {
    pressed_run: u32,
    down: bool,
    press_ticks: u32,
    hold_ticks: u32,
}

impl ButtonClassifier {
    /// Thresholds in fast ticks; `hold_ticks` is raised to at least `press_ticks + 1`.
    pub fn new(press_ticks: u32, hold_ticks: u32) -> Self {
        let press_ticks = press_ticks.max(1);
        Self {
            pressed_run: 0,
            down: false,
            press_ticks,
            hold_ticks: hold_ticks.max(press_ticks.saturating_add(1)),
        }
    }

    pub fn from_cfg(cfg: &ButtonCfg, tick: Duration) -> Self {
        Self::new(ticks_for_ms(cfg.press_ms, tick), ticks_for_ms(cfg.hold_ms, tick))
    }

    /// Sample the debounced raw level once.
    ///
    /// Returns the classification of the run that just ended on a release
    /// edge; `ButtonAction::None` while pressed, while idle, or when the run
    /// was shorter than the press threshold.
    pub fn tick(&mut self, pressed: bool) -> ButtonAction {
        if pressed {
            self.down = true;
            // Saturate at the hold threshold; longer holds classify the same.
            if self.pressed_run < self.hold_ticks {
                self.pressed_run += 1;
            }
            return ButtonAction::None;
        }

        let run = self.pressed_run;
        self.pressed_run = 0;
        self.down = false;
        if run >= self.hold_ticks {
            ButtonAction::Hold
        } else if run >= self.press_ticks {
            ButtonAction::Press
        } else {
            ButtonAction::None
        }
    }

    /// Whether the last sample read "pressed".
    #[inline]
    pub fn is_down(&self) -> bool {
        self.down
    }

    #[inline]
    pub fn pressed_run(&self) -> u32 {
        self.pressed_run
    }
}

//! Sustained-absence filter for the hopper.
//!
//! Absence has to persist for `threshold` consecutive fast ticks before the
//! hopper is reported empty; a single present classification restores
//! "more marbles" immediately. Only the "gone" edge is debounced.

use std::time::Duration;

use crate::config::PresenceCfg;
use crate::util::ticks_for_ms;

#[derive(Debug, Clone)]
pub struct PresenceDebouncer {
    absent_run: u32,
    threshold: u32,
    has_more: bool,
}

impl PresenceDebouncer {
    /// `threshold` is the number of consecutive absent ticks that empties the hopper.
    pub fn new(threshold: u32) -> Self {
        Self {
            absent_run: 0,
            threshold: threshold.max(1),
            has_more: true,
        }
    }

    /// Build from a duration threshold sampled every `tick`.
    pub fn from_cfg(cfg: &PresenceCfg, tick: Duration) -> Self {
        Self::new(ticks_for_ms(cfg.absence_ms, tick))
    }

    /// Feed one classification; returns whether marbles remain.
    pub fn observe(&mut self, no_marble: bool) -> bool {
        if no_marble {
            self.absent_run = self.absent_run.saturating_add(1);
            if self.absent_run >= self.threshold {
                if self.has_more {
                    tracing::trace!(run = self.absent_run, "presence: hopper empty");
                }
                self.has_more = false;
            }
        } else {
            self.absent_run = 0;
            self.has_more = true;
        }
        self.has_more
    }

    #[inline]
    pub fn has_more_marbles(&self) -> bool {
        self.has_more
    }

    #[inline]
    pub fn absent_run(&self) -> u32 {
        self.absent_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_on_the_threshold_tick_not_before() {
        let mut d = PresenceDebouncer::new(4);
        assert!(d.observe(true));
        assert!(d.observe(true));
        assert!(d.observe(true));
        assert!(!d.observe(true));
        assert!(!d.observe(true));
    }

    #[test]
    fn presence_resets_run_and_restores_immediately() {
        let mut d = PresenceDebouncer::new(3);
        d.observe(true);
        d.observe(true);
        assert!(d.observe(false));
        assert_eq!(d.absent_run(), 0);
        assert!(d.observe(true));
        assert!(d.observe(true));
        assert!(!d.observe(true));
        assert!(d.observe(false), "reappearing marble must not be debounced");
    }

    #[test]
    fn duration_threshold_uses_tick_period() {
        let cfg = PresenceCfg { absence_ms: 80 };
        let d = PresenceDebouncer::from_cfg(&cfg, Duration::from_millis(1));
        assert_eq!(d.threshold, 80);
        let d = PresenceDebouncer::from_cfg(&cfg, Duration::from_millis(10));
        assert_eq!(d.threshold, 8);
    }
}

//! Sorting-time accumulator.

use crate::types::ElapsedTime;

/// Turns pacer quanta into minutes and seconds.
///
/// Only fed while the machine is in the Sort state: the pacer publishes quanta
/// solely in Sort and the control loop drains them solely while sorting.
#[derive(Debug, Clone)]
pub struct ElapsedTimeAccumulator {
    quanta_per_second: u32,
    quanta: u32,
    value: ElapsedTime,
}

impl ElapsedTimeAccumulator {
    pub fn new(quanta_per_second: u32) -> Self {
        Self {
            quanta_per_second: quanta_per_second.max(1),
            quanta: 0,
            value: ElapsedTime::default(),
        }
    }

    /// Account for one time quantum.
    pub fn tick(&mut self) {
        self.quanta += 1;
        if self.quanta < self.quanta_per_second {
            return;
        }
        self.quanta = 0;
        self.value.seconds += 1;
        if self.value.seconds >= 60 {
            self.value.seconds = 0;
            self.value.minutes = self.value.minutes.saturating_add(1);
        }
    }

    /// Account for `n` quanta at once.
    pub fn tick_n(&mut self, n: u32) {
        for _ in 0..n {
            self.tick();
        }
    }

    #[inline]
    pub fn value(&self) -> ElapsedTime {
        self.value
    }

    pub fn reset(&mut self) {
        self.quanta = 0;
        self.value = ElapsedTime::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_quanta_make_a_second() {
        let mut t = ElapsedTimeAccumulator::new(100);
        t.tick_n(99);
        assert_eq!(t.value(), ElapsedTime::default());
        t.tick();
        assert_eq!(
            t.value(),
            ElapsedTime {
                minutes: 0,
                seconds: 1
            }
        );
    }

    #[test]
    fn sixty_seconds_roll_into_a_minute() {
        let mut t = ElapsedTimeAccumulator::new(1);
        t.tick_n(59);
        assert_eq!(t.value().seconds, 59);
        t.tick();
        assert_eq!(
            t.value(),
            ElapsedTime {
                minutes: 1,
                seconds: 0
            }
        );
        t.tick_n(61);
        assert_eq!(
            t.value(),
            ElapsedTime {
                minutes: 2,
                seconds: 1
            }
        );
    }

    #[test]
    fn reset_drops_partial_second() {
        let mut t = ElapsedTimeAccumulator::new(10);
        t.tick_n(15);
        t.reset();
        t.tick_n(9);
        assert_eq!(t.value(), ElapsedTime::default());
    }
}

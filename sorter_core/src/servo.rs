//! Marble -> flap angle -> PWM compare value.

use crate::config::ServoCfg;
use crate::error::SorterError;
use crate::types::{MarblePosition, MarbleType};

/// Resting angle; also where absent marbles are "routed".
pub const NEUTRAL_DEG: f32 = 90.0;

/// Routing table plus the degrees-to-pulse conversion.
#[derive(Debug, Clone)]
pub struct ServoMapper {
    period_counts: u32,
    min_offset: i32,
    max_offset: i32,
}

impl Default for ServoMapper {
    fn default() -> Self {
        Self::from(&ServoCfg::default())
    }
}

impl From<&ServoCfg> for ServoMapper {
    fn from(c: &ServoCfg) -> Self {
        Self {
            period_counts: c.period_counts,
            min_offset: c.min_offset,
            max_offset: c.max_offset,
        }
    }
}

impl ServoMapper {
    /// Target angle for `marble` on the flap at `position`.
    ///
    /// The two flaps are mirrored, so the same colour swings opposite ways.
    pub fn angle_for(&self, marble: MarbleType, position: MarblePosition) -> f32 {
        match (marble, position) {
            (MarbleType::White, MarblePosition::Zero) => 180.0,
            (MarbleType::White, MarblePosition::One) => 0.0,
            (MarbleType::Black, MarblePosition::Zero) => 0.0,
            (MarbleType::Black, MarblePosition::One) => 180.0,
            (MarbleType::None, _) => NEUTRAL_DEG,
        }
    }

    /// Linear 1.0..2.0 ms on-time across 0..=180 degrees in a 20 ms frame,
    /// halved for the phase-correct compare register.
    pub fn pulse_for_angle(&self, degrees: f32) -> Result<u16, SorterError> {
        if !(0.0..=180.0).contains(&degrees) {
            return Err(SorterError::InvalidAngle(degrees));
        }

        let mut offset = 0i32;
        // Full swing falls short on real servos; only the exact extremes are corrected.
        if degrees == 0.0 {
            offset = self.min_offset;
        }
        if degrees == 180.0 {
            offset = self.max_offset;
        }

        let on_time = ((f64::from(degrees) / 180.0) + 1.0) / 20.0 * f64::from(self.period_counts);
        let counts = (on_time + f64::from(offset)) as i64 >> 1;
        u16::try_from(counts).map_err(|_| SorterError::PulseOutOfRange { degrees, counts })
    }

    /// Every pulse the sorter ever drives (both extremes and neutral) fits
    /// the compare register.
    pub fn check_range(&self) -> Result<(), SorterError> {
        for degrees in [0.0, NEUTRAL_DEG, 180.0] {
            self.pulse_for_angle(degrees)?;
        }
        Ok(())
    }

    /// `angle_for` followed by `pulse_for_angle`.
    pub fn pulse_for(&self, marble: MarbleType, position: MarblePosition) -> Result<u16, SorterError> {
        self.pulse_for_angle(self.angle_for(marble, position))
    }

    /// Pulse for the neutral position.
    pub fn neutral_pulse(&self) -> Result<u16, SorterError> {
        self.pulse_for_angle(NEUTRAL_DEG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn linear(deg: f32) -> u16 {
        ((((f64::from(deg) / 180.0) + 1.0) / 20.0 * 40_000.0) as i32 >> 1) as u16
    }

    #[rstest]
    #[case(MarbleType::White, MarblePosition::Zero, 180.0)]
    #[case(MarbleType::White, MarblePosition::One, 0.0)]
    #[case(MarbleType::Black, MarblePosition::Zero, 0.0)]
    #[case(MarbleType::Black, MarblePosition::One, 180.0)]
    #[case(MarbleType::None, MarblePosition::Zero, 90.0)]
    #[case(MarbleType::None, MarblePosition::One, 90.0)]
    fn routing_table(#[case] m: MarbleType, #[case] p: MarblePosition, #[case] deg: f32) {
        assert_eq!(ServoMapper::default().angle_for(m, p), deg);
    }

    #[test]
    fn extremes_carry_their_offsets() {
        let s = ServoMapper::default();
        assert_eq!(s.pulse_for_angle(0.0).unwrap(), (2_000 - 700) >> 1);
        assert_eq!(s.pulse_for_angle(180.0).unwrap(), (4_000 + 550) >> 1);
        assert_eq!(s.neutral_pulse().unwrap(), 1_500);
    }

    #[rstest]
    #[case(-0.5)]
    #[case(-90.0)]
    #[case(180.01)]
    #[case(360.0)]
    #[case(f32::NAN)]
    fn out_of_range_is_rejected(#[case] deg: f32) {
        assert!(matches!(
            ServoMapper::default().pulse_for_angle(deg),
            Err(SorterError::InvalidAngle(_))
        ));
    }

    #[test]
    fn negative_pulse_is_an_error_not_a_clamp() {
        let s = ServoMapper::from(&ServoCfg {
            min_offset: -5_000,
            ..ServoCfg::default()
        });
        assert!(matches!(
            s.pulse_for_angle(0.0),
            Err(SorterError::PulseOutOfRange { counts, .. }) if counts < 0
        ));
        assert!(s.check_range().is_err());
        assert_eq!(s.neutral_pulse().unwrap(), 1_500);
    }

    #[test]
    fn oversized_period_overflows_the_register() {
        let s = ServoMapper::from(&ServoCfg {
            period_counts: 4_000_000,
            ..ServoCfg::default()
        });
        assert!(matches!(
            s.neutral_pulse(),
            Err(SorterError::PulseOutOfRange { counts, .. }) if counts > i64::from(u16::MAX)
        ));
        assert!(ServoMapper::default().check_range().is_ok());
    }

    proptest! {
        #[test]
        fn interior_angles_use_the_plain_formula(deg in 0.001f32..179.999) {
            prop_assert_eq!(ServoMapper::default().pulse_for_angle(deg).unwrap(), linear(deg));
        }
    }
}

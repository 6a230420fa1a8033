//! Value types shared by the sorter components.

/// Classification of one sensing channel at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarbleType {
    Black,
    White,
    /// Nothing in front of the sensor.
    None,
}

impl MarbleType {
    #[inline]
    pub fn is_marble(self) -> bool {
        !matches!(self, MarbleType::None)
    }
}

/// Lane (and servo) a classification belongs to.
///
/// The presence-sensing channel has no position: `from_index` returns `None`
/// for anything but 0 or 1, so it can never be routed to a servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarblePosition {
    Zero,
    One,
}

impl MarblePosition {
    pub const ALL: [MarblePosition; 2] = [MarblePosition::Zero, MarblePosition::One];

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(MarblePosition::Zero),
            1 => Some(MarblePosition::One),
            _ => None,
        }
    }

    #[inline]
    pub fn index(self) -> u8 {
        match self {
            MarblePosition::Zero => 0,
            MarblePosition::One => 1,
        }
    }
}

/// Classified history of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ButtonAction {
    #[default]
    None = 0,
    Press = 1,
    Hold = 2,
}

impl ButtonAction {
    #[inline]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => ButtonAction::Press,
            2 => ButtonAction::Hold,
            _ => ButtonAction::None,
        }
    }
}

/// The two operator buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    StartStop,
    Reset,
}

/// Operator-visible mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SorterState {
    #[default]
    Idle = 0,
    Sort = 1,
    Recall = 2,
    Reset = 3,
    Test = 4,
}

impl SorterState {
    #[inline]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => SorterState::Sort,
            2 => SorterState::Recall,
            3 => SorterState::Reset,
            4 => SorterState::Test,
            _ => SorterState::Idle,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SorterState::Idle => "idle",
            SorterState::Sort => "sort",
            SorterState::Recall => "recall",
            SorterState::Reset => "reset",
            SorterState::Test => "test",
        }
    }
}

/// Black/white tallies. `total` is always `black + white`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarbleCounts {
    black: u32,
    white: u32,
}

impl MarbleCounts {
    pub fn new(black: u32, white: u32) -> Self {
        Self { black, white }
    }

    #[inline]
    pub fn black(&self) -> u32 {
        self.black
    }

    #[inline]
    pub fn white(&self) -> u32 {
        self.white
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.black.saturating_add(self.white)
    }

    /// Count one classification; `MarbleType::None` leaves the tallies untouched.
    pub(crate) fn record(&mut self, marble: MarbleType) -> bool {
        match marble {
            MarbleType::Black => self.black = self.black.saturating_add(1),
            MarbleType::White => self.white = self.white.saturating_add(1),
            MarbleType::None => return false,
        }
        true
    }
}

/// Time spent in the Sort state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ElapsedTime {
    pub minutes: u32,
    pub seconds: u32,
}

impl core::fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// Durable copy of the statistics as read back for Recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistedSnapshot {
    pub elapsed: ElapsedTime,
    pub black: u8,
    pub white: u8,
}

impl PersistedSnapshot {
    pub fn total(&self) -> u32 {
        u32::from(self.black) + u32::from(self.white)
    }
}

/// Two-colour status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndicatorColor {
    #[default]
    Off,
    Red,
    Green,
    Yellow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_from_index_rejects_null_lane() {
        assert_eq!(MarblePosition::from_index(0), Some(MarblePosition::Zero));
        assert_eq!(MarblePosition::from_index(1), Some(MarblePosition::One));
        assert_eq!(MarblePosition::from_index(-1), None);
        assert_eq!(MarblePosition::from_index(2), None);
    }

    #[test]
    fn action_and_state_roundtrip_through_u8() {
        for a in [ButtonAction::None, ButtonAction::Press, ButtonAction::Hold] {
            assert_eq!(ButtonAction::from_u8(a as u8), a);
        }
        for s in [
            SorterState::Idle,
            SorterState::Sort,
            SorterState::Recall,
            SorterState::Reset,
            SorterState::Test,
        ] {
            assert_eq!(SorterState::from_u8(s as u8), s);
        }
    }

    #[test]
    fn counts_ignore_absent_marbles() {
        let mut c = MarbleCounts::default();
        assert!(c.record(MarbleType::Black));
        assert!(c.record(MarbleType::White));
        assert!(!c.record(MarbleType::None));
        assert_eq!((c.black(), c.white(), c.total()), (1, 1, 2));
    }

    #[test]
    fn elapsed_displays_as_mm_ss() {
        let t = ElapsedTime {
            minutes: 3,
            seconds: 7,
        };
        assert_eq!(t.to_string(), "03:07");
    }
}

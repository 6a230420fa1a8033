//! Notifications for the display collaborator.

use crate::types::{MarblePosition, MarbleType, PersistedSnapshot};

/// Why the machine left the Sort state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Start/stop pressed while sorting.
    OperatorStop,
    /// Hopper ran dry after enough marbles were sorted.
    WatchdogSuccess,
    /// Hopper ran dry too early; needs acknowledgment.
    WatchdogFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SorterEvent {
    SortStarted,
    /// Start was requested with an empty hopper.
    NoMoreMarbles,
    Sorted {
        position: MarblePosition,
        marble: MarbleType,
    },
    SortStopped {
        reason: StopReason,
        total: u32,
    },
    ErrorAcknowledged,
    RecallShown(PersistedSnapshot),
    RecallClosed,
    ResetDone,
    TestEntered,
    TestExited,
}

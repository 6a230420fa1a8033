//! Cells shared between the tick threads and the control loop.
//!
//! Every cell is a single atomic. The tick side only ever sets or publishes;
//! the control loop consumes and clears. Nothing here is a multi-field record,
//! so no lock is needed across the boundary.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::types::{ButtonAction, ButtonId, SorterState};

const NO_READING: u32 = u32::MAX;

/// One pending button action awaiting consumption.
#[derive(Debug, Default)]
pub struct PendingAction(AtomicU8);

impl PendingAction {
    /// Publish a classification. `None` is never stored; it would erase a
    /// pending action the control loop has not seen yet.
    pub fn publish(&self, action: ButtonAction) {
        if action != ButtonAction::None {
            self.0.store(action as u8, Ordering::Release);
        }
    }

    #[inline]
    pub fn peek(&self) -> ButtonAction {
        ButtonAction::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Take the pending action, leaving `None` behind.
    #[inline]
    pub fn take(&self) -> ButtonAction {
        ButtonAction::from_u8(self.0.swap(ButtonAction::None as u8, Ordering::AcqRel))
    }

    /// Take the pending action only if it equals `expected`.
    pub fn take_if(&self, expected: ButtonAction) -> bool {
        if expected == ButtonAction::None {
            return false;
        }
        self.0
            .compare_exchange(
                expected as u8,
                ButtonAction::None as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    #[inline]
    pub fn clear(&self) {
        self.0.store(ButtonAction::None as u8, Ordering::Release);
    }
}

/// Flags and latest values crossing the tick/control boundary.
#[derive(Debug)]
pub struct Signals {
    start_stop: PendingAction,
    reset: PendingAction,
    /// Readiness gate: true while neither button reads pressed.
    buttons_idle: AtomicBool,
    more_marbles: AtomicBool,
    watchdog: AtomicBool,
    pace: AtomicBool,
    time_quanta: AtomicU32,
    readings: [AtomicU32; 2],
    state: AtomicU8,
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}

impl Signals {
    pub fn new() -> Self {
        Self {
            start_stop: PendingAction::default(),
            reset: PendingAction::default(),
            buttons_idle: AtomicBool::new(true),
            more_marbles: AtomicBool::new(true),
            watchdog: AtomicBool::new(false),
            pace: AtomicBool::new(false),
            time_quanta: AtomicU32::new(0),
            readings: [AtomicU32::new(NO_READING), AtomicU32::new(NO_READING)],
            state: AtomicU8::new(SorterState::Idle as u8),
        }
    }

    fn slot(&self, button: ButtonId) -> &PendingAction {
        match button {
            ButtonId::StartStop => &self.start_stop,
            ButtonId::Reset => &self.reset,
        }
    }

    // ---- buttons ----

    pub fn publish_action(&self, button: ButtonId, action: ButtonAction) {
        self.slot(button).publish(action);
    }

    pub fn set_buttons_idle(&self, idle: bool) {
        self.buttons_idle.store(idle, Ordering::Release);
    }

    #[inline]
    pub fn buttons_idle(&self) -> bool {
        self.buttons_idle.load(Ordering::Acquire)
    }

    /// Pending action for `button`; `None` while either button is held down.
    pub fn peek(&self, button: ButtonId) -> ButtonAction {
        if !self.buttons_idle() {
            return ButtonAction::None;
        }
        self.slot(button).peek()
    }

    /// Take the pending action for `button`. Gated like `peek`.
    pub fn consume(&self, button: ButtonId) -> ButtonAction {
        if !self.buttons_idle() {
            return ButtonAction::None;
        }
        self.slot(button).take()
    }

    /// Take the pending action for `button` only if it is `action`.
    pub fn consume_if(&self, button: ButtonId, action: ButtonAction) -> bool {
        self.buttons_idle() && self.slot(button).take_if(action)
    }

    /// Drop every pending action on both buttons.
    pub fn clear_actions(&self) {
        self.start_stop.clear();
        self.reset.clear();
    }

    // ---- presence ----

    pub fn set_more_marbles(&self, more: bool) {
        self.more_marbles.store(more, Ordering::Release);
    }

    #[inline]
    pub fn more_marbles(&self) -> bool {
        self.more_marbles.load(Ordering::Acquire)
    }

    /// Latest raw reading for `lane` (0 or 1).
    pub fn store_reading(&self, lane: usize, raw: u16) {
        if let Some(cell) = self.readings.get(lane) {
            cell.store(u32::from(raw), Ordering::Release);
        }
    }

    pub fn reading(&self, lane: usize) -> Option<u16> {
        let v = self.readings.get(lane)?.load(Ordering::Acquire);
        u16::try_from(v).ok()
    }

    // ---- pacer ----

    pub fn raise_pace(&self) {
        self.pace.store(true, Ordering::Release);
    }

    /// Returns whether a sort cycle is due, clearing the flag.
    pub fn take_pace(&self) -> bool {
        self.pace.swap(false, Ordering::AcqRel)
    }

    pub fn raise_watchdog(&self) {
        self.watchdog.store(true, Ordering::Release);
    }

    #[inline]
    pub fn watchdog(&self) -> bool {
        self.watchdog.load(Ordering::Acquire)
    }

    pub fn clear_watchdog(&self) {
        self.watchdog.store(false, Ordering::Release);
    }

    pub fn add_time_quantum(&self) {
        self.time_quanta.fetch_add(1, Ordering::AcqRel);
    }

    /// Quanta accumulated since the last drain.
    pub fn drain_time_quanta(&self) -> u32 {
        self.time_quanta.swap(0, Ordering::AcqRel)
    }

    // ---- state ----

    pub fn publish_state(&self, state: SorterState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn state(&self) -> SorterState {
        SorterState::from_u8(self.state.load(Ordering::Acquire))
    }
}

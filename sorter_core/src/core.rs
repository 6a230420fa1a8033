//! The operator state machine (`Sorter`).
//!
//! Consumes button actions and pacer flags from `Signals`, runs sort cycles,
//! and exposes the query surface the display layer renders. `step` never
//! blocks on an operator: the waits for a Recall/Test exit or an error
//! acknowledgment are states that each call re-polls.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use sorter_traits::clock::Clock;
use sorter_traits::{ByteStore, ServoDriver};

use crate::classifier::SensorClassifier;
use crate::counts::CountStore;
use crate::elapsed::ElapsedTimeAccumulator;
use crate::error::Result;
use crate::events::{SorterEvent, StopReason};
use crate::hw_error::map_hw_error;
use crate::servo::ServoMapper;
use crate::signals::Signals;
use crate::types::{
    ButtonAction, ButtonId, ElapsedTime, IndicatorColor, MarbleCounts, MarblePosition,
    MarbleType, PersistedSnapshot, SorterState,
};

const SINGLE_LANE: &[MarblePosition] = &[MarblePosition::Zero];

pub struct Sorter<V: ServoDriver, B: ByteStore> {
    pub(crate) servo: V,
    pub(crate) counts: CountStore<B>,
    pub(crate) mapper: ServoMapper,
    pub(crate) classifier: SensorClassifier,
    pub(crate) elapsed: ElapsedTimeAccumulator,
    pub(crate) signals: Arc<Signals>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) events_tx: xch::Sender<SorterEvent>,
    pub(crate) events_rx: xch::Receiver<SorterEvent>,
    pub(crate) lanes: u8,
    pub(crate) dwell: Duration,
    pub(crate) success_threshold: u32,

    pub(crate) state: SorterState,
    pub(crate) awaiting_ack: bool,
    pub(crate) indicator: IndicatorColor,
    pub(crate) snapshot: Option<PersistedSnapshot>,
}

impl<V: ServoDriver, B: ByteStore> core::fmt::Debug for Sorter<V, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sorter")
            .field("state", &self.state)
            .field("counts", &self.counts.counts())
            .field("elapsed", &self.elapsed.value())
            .field("awaiting_ack", &self.awaiting_ack)
            .finish()
    }
}

impl<V: ServoDriver, B: ByteStore> Sorter<V, B> {
    // ---- query surface ----

    pub fn state(&self) -> SorterState {
        self.state
    }

    pub fn counts(&self) -> MarbleCounts {
        self.counts.counts()
    }

    pub fn elapsed(&self) -> ElapsedTime {
        self.elapsed.value()
    }

    pub fn has_more_marbles(&self) -> bool {
        self.signals.more_marbles()
    }

    /// True while a failed run waits for a start/stop press.
    pub fn flash_error(&self) -> bool {
        self.awaiting_ack
    }

    pub fn indicator(&self) -> IndicatorColor {
        self.indicator
    }

    /// Snapshot loaded on entering Recall; `None` outside Recall.
    pub fn recall_snapshot(&self) -> Option<PersistedSnapshot> {
        self.snapshot
    }

    /// A receiver for state-machine notifications. Every clone competes for
    /// the same events, so hand out one per consumer.
    pub fn events(&self) -> xch::Receiver<SorterEvent> {
        self.events_rx.clone()
    }

    pub fn signals(&self) -> &Arc<Signals> {
        &self.signals
    }

    pub fn store(&self) -> &B {
        self.counts.store()
    }

    // ---- control loop ----

    /// Drive every servo to neutral.
    pub fn park(&mut self) -> Result<()> {
        for &position in self.positions() {
            self.drive(position, MarbleType::None)?;
        }
        Ok(())
    }

    /// One pass of the control loop. Returns the state after the pass.
    pub fn step(&mut self) -> Result<SorterState> {
        match self.state {
            SorterState::Idle => self.step_idle()?,
            SorterState::Sort if self.awaiting_ack => self.step_ack(),
            SorterState::Sort => self.step_sort()?,
            SorterState::Recall => {
                if self.signals.consume_if(ButtonId::StartStop, ButtonAction::Hold) {
                    self.snapshot = None;
                    self.emit(SorterEvent::RecallClosed);
                    self.transition(SorterState::Idle);
                }
            }
            SorterState::Test => {
                if self.signals.consume_if(ButtonId::Reset, ButtonAction::Hold) {
                    self.emit(SorterEvent::TestExited);
                    self.transition(SorterState::Idle);
                }
            }
            // Reset completes inside the step that entered it.
            SorterState::Reset => self.transition(SorterState::Idle),
        }
        Ok(self.state)
    }

    fn step_idle(&mut self) -> Result<()> {
        let s = self.signals.clone();
        if s.consume_if(ButtonId::StartStop, ButtonAction::Press) {
            if s.more_marbles() {
                self.start_sort();
            } else {
                tracing::info!("start refused: no more marbles");
                s.clear_actions();
                self.emit(SorterEvent::NoMoreMarbles);
            }
        } else if s.consume_if(ButtonId::StartStop, ButtonAction::Hold) {
            self.enter_recall();
        } else if s.consume_if(ButtonId::Reset, ButtonAction::Press) {
            self.reset_stats();
        } else if s.consume_if(ButtonId::Reset, ButtonAction::Hold) {
            self.transition(SorterState::Test);
            self.emit(SorterEvent::TestEntered);
        }
        Ok(())
    }

    fn step_sort(&mut self) -> Result<()> {
        let quanta = self.signals.drain_time_quanta();
        self.elapsed.tick_n(quanta);

        if self.signals.consume_if(ButtonId::StartStop, ButtonAction::Press) {
            self.finish_sort(StopReason::OperatorStop, IndicatorColor::Yellow);
            return Ok(());
        }

        if self.signals.watchdog() {
            self.signals.clear_watchdog();
            let total = self.counts.counts().total();
            if total >= self.success_threshold {
                self.finish_sort(StopReason::WatchdogSuccess, IndicatorColor::Red);
            } else {
                tracing::warn!(
                    total,
                    threshold = self.success_threshold,
                    "sort run failed; awaiting acknowledgment"
                );
                self.awaiting_ack = true;
                self.indicator = IndicatorColor::Red;
                self.signals.clear_actions();
                self.emit(SorterEvent::SortStopped {
                    reason: StopReason::WatchdogFailure,
                    total,
                });
            }
            return Ok(());
        }

        if self.signals.take_pace() {
            self.sort_cycle().wrap_err("sort cycle")?;
        }
        Ok(())
    }

    fn step_ack(&mut self) {
        // Time does not accrue while the error is displayed.
        let _ = self.signals.drain_time_quanta();
        if self.signals.consume_if(ButtonId::StartStop, ButtonAction::Press) {
            self.awaiting_ack = false;
            self.indicator = IndicatorColor::Off;
            self.signals.clear_watchdog();
            self.emit(SorterEvent::ErrorAcknowledged);
            self.transition(SorterState::Idle);
        }
    }

    /// Classify, count, persist, route, dwell, return to neutral.
    fn sort_cycle(&mut self) -> Result<()> {
        let mut seen = [(MarblePosition::Zero, MarbleType::None); 2];
        let positions = self.positions();

        for (slot, position) in seen.iter_mut().zip(positions.iter().copied()) {
            let lane = usize::from(position.index());
            let marble = match self.signals.reading(lane) {
                Some(raw) => self.classifier.classify(raw).0,
                None => MarbleType::None,
            };
            if self.counts.record(marble) {
                self.emit(SorterEvent::Sorted { position, marble });
            }
            *slot = (position, marble);
        }

        if let Err(e) = self.counts.sync(self.elapsed.value()) {
            tracing::warn!(error = %e, "failed to persist counts");
        }

        let seen = &seen[..positions.len()];
        tracing::debug!(?seen, counts = ?self.counts.counts(), "sort cycle");
        if !seen.iter().any(|(_, m)| m.is_marble()) {
            return Ok(());
        }

        let routed = seen
            .iter()
            .try_for_each(|&(position, marble)| self.drive(position, marble));
        if let Err(e) = routed {
            // No flap may stay deflected after a failed cycle.
            if let Err(park_err) = self.park() {
                tracing::warn!(error = %park_err, "failed to park servos after a routing error");
            }
            return Err(e);
        }
        self.clock.sleep(self.dwell);
        self.park()
    }

    fn start_sort(&mut self) {
        // Stale flags from before this run must not fire a cycle or a timeout.
        let _ = self.signals.take_pace();
        let _ = self.signals.drain_time_quanta();
        self.signals.clear_watchdog();
        self.indicator = IndicatorColor::Green;
        self.transition(SorterState::Sort);
        self.emit(SorterEvent::SortStarted);
    }

    fn finish_sort(&mut self, reason: StopReason, indicator: IndicatorColor) {
        let total = self.counts.counts().total();
        tracing::info!(?reason, total, elapsed = %self.elapsed.value(), "sort stopped");
        self.indicator = indicator;
        self.emit(SorterEvent::SortStopped { reason, total });
        self.transition(SorterState::Idle);
    }

    fn enter_recall(&mut self) {
        let snapshot = self.counts.load_snapshot().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read persisted statistics");
            PersistedSnapshot::default()
        });
        self.snapshot = Some(snapshot);
        self.transition(SorterState::Recall);
        self.emit(SorterEvent::RecallShown(snapshot));
    }

    fn reset_stats(&mut self) {
        self.transition(SorterState::Reset);
        self.elapsed.reset();
        if let Err(e) = self.counts.reset() {
            tracing::warn!(error = %e, "failed to zero persisted statistics");
        }
        self.indicator = IndicatorColor::Off;
        self.emit(SorterEvent::ResetDone);
        self.transition(SorterState::Idle);
    }

    /// Move to `next`, publish it for the pacer, and drop every pending action.
    fn transition(&mut self, next: SorterState) {
        if next != self.state {
            tracing::info!(from = self.state.name(), to = next.name(), "state change");
        }
        self.state = next;
        self.signals.publish_state(next);
        self.signals.clear_actions();
    }

    fn drive(&mut self, position: MarblePosition, marble: MarbleType) -> Result<()> {
        let pulse = self.mapper.pulse_for(marble, position)?;
        self.servo
            .set_pulse(position.index(), pulse)
            .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))
            .wrap_err_with(|| format!("servo {}", position.index()))
    }

    fn positions(&self) -> &'static [MarblePosition] {
        if self.lanes >= 2 {
            &MarblePosition::ALL
        } else {
            SINGLE_LANE
        }
    }

    fn emit(&self, event: SorterEvent) {
        if self.events_tx.try_send(event).is_err() {
            tracing::trace!("event queue full; dropping event");
        }
    }
}

//! Type-state builder for the boxed `DynSorter` and the generic `build_sorter`.
//!
//! `build()` only exists once both the servo driver and the byte store were
//! supplied; `try_build()` is always available and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;

use crossbeam_channel as xch;
use sorter_traits::clock::{Clock, MonotonicClock};
use sorter_traits::{ByteStore, ServoDriver};

use crate::classifier::SensorClassifier;
use crate::config::SorterCfg;
use crate::core::Sorter;
use crate::counts::CountStore;
use crate::elapsed::ElapsedTimeAccumulator;
use crate::error::{BuildError, Result};
use crate::servo::ServoMapper;
use crate::signals::Signals;
use crate::types::{IndicatorColor, SorterState};

/// Default depth of the event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Sorter over boxed devices, as produced by `SorterBuilder`.
pub type DynSorter = Sorter<Box<dyn ServoDriver + Send>, Box<dyn ByteStore + Send>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct SorterBuilder<V, B> {
    servo: Option<Box<dyn ServoDriver + Send>>,
    store: Option<Box<dyn ByteStore + Send>>,
    cfg: Option<SorterCfg>,
    signals: Option<Arc<Signals>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    event_capacity: usize,
    _v: PhantomData<V>,
    _b: PhantomData<B>,
}

impl Default for SorterBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            servo: None,
            store: None,
            cfg: None,
            signals: None,
            clock: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            _v: PhantomData,
            _b: PhantomData,
        }
    }
}

impl DynSorter {
    /// Start building a boxed sorter.
    pub fn builder() -> SorterBuilder<Missing, Missing> {
        SorterBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Check `cfg` and assemble a `Sorter`, parking every servo at neutral.
fn validate_and_build<V: ServoDriver, B: ByteStore>(
    servo: V,
    store: B,
    cfg: SorterCfg,
    signals: Option<Arc<Signals>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    event_capacity: usize,
) -> Result<Sorter<V, B>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if cfg.sensor.white_threshold >= cfg.sensor.black_threshold {
        return Err(invalid("white_threshold must be below black_threshold"));
    }
    if !(1..=2).contains(&cfg.sensor.lanes) {
        return Err(invalid("lanes must be 1 or 2"));
    }
    if cfg.buttons.press_ms == 0 {
        return Err(invalid("press_ms must be > 0"));
    }
    if cfg.buttons.hold_ms <= cfg.buttons.press_ms {
        return Err(invalid("hold_ms must exceed press_ms"));
    }
    if cfg.timing.fast_tick.is_zero() || cfg.timing.pacer_tick.is_zero() {
        return Err(invalid("tick periods must be > 0"));
    }
    if cfg.timing.sort_every_ticks == 0 || cfg.timing.watchdog_ticks == 0 {
        return Err(invalid("pacer dividers must be > 0"));
    }
    if cfg.timing.quanta_per_second == 0 {
        return Err(invalid("quanta_per_second must be > 0"));
    }
    if cfg.servo.period_counts == 0 {
        return Err(invalid("period_counts must be > 0"));
    }
    if ServoMapper::from(&cfg.servo).check_range().is_err() {
        return Err(invalid(
            "servo period_counts/offsets put a pulse outside the compare register",
        ));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let signals = signals.unwrap_or_default();
    signals.publish_state(SorterState::Idle);
    let (events_tx, events_rx) = xch::bounded(event_capacity.max(1));

    let mut sorter = Sorter {
        servo,
        counts: CountStore::new(store),
        mapper: ServoMapper::from(&cfg.servo),
        classifier: SensorClassifier::from(&cfg.sensor),
        elapsed: ElapsedTimeAccumulator::new(cfg.timing.quanta_per_second),
        signals,
        clock,
        events_tx,
        events_rx,
        lanes: cfg.sensor.lanes,
        dwell: cfg.servo.dwell,
        success_threshold: cfg.sort.success_threshold,
        state: SorterState::Idle,
        awaiting_ack: false,
        indicator: IndicatorColor::Off,
        snapshot: None,
    };
    sorter.park()?;
    Ok(sorter)
}

impl<V, B> SorterBuilder<V, B> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<DynSorter> {
        let servo = self
            .servo
            .ok_or_else(|| eyre::Report::new(BuildError::MissingServo))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        validate_and_build(
            servo,
            store,
            self.cfg.unwrap_or_default(),
            self.signals,
            self.clock,
            self.event_capacity,
        )
    }

    pub fn with_config(mut self, cfg: SorterCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Share an existing `Signals` with tick threads; a fresh one is made otherwise.
    pub fn with_signals(mut self, signals: Arc<Signals>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl<B> SorterBuilder<Missing, B> {
    pub fn with_servo(self, servo: impl ServoDriver + Send + 'static) -> SorterBuilder<Set, B> {
        SorterBuilder {
            servo: Some(Box::new(servo)),
            store: self.store,
            cfg: self.cfg,
            signals: self.signals,
            clock: self.clock,
            event_capacity: self.event_capacity,
            _v: PhantomData,
            _b: PhantomData,
        }
    }
}

impl<V> SorterBuilder<V, Missing> {
    pub fn with_store(self, store: impl ByteStore + Send + 'static) -> SorterBuilder<V, Set> {
        SorterBuilder {
            servo: self.servo,
            store: Some(Box::new(store)),
            cfg: self.cfg,
            signals: self.signals,
            clock: self.clock,
            event_capacity: self.event_capacity,
            _v: PhantomData,
            _b: PhantomData,
        }
    }
}

impl SorterBuilder<Set, Set> {
    pub fn build(self) -> Result<DynSorter> {
        self.try_build()
    }
}

/// Build a statically-dispatched `Sorter` from concrete devices.
pub fn build_sorter<V, B>(
    servo: V,
    store: B,
    cfg: SorterCfg,
    signals: Arc<Signals>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Sorter<V, B>>
where
    V: ServoDriver,
    B: ByteStore,
{
    validate_and_build(servo, store, cfg, Some(signals), clock, DEFAULT_EVENT_CAPACITY)
}

//! Fast tick, pacer and control loop driven in lockstep over simulated devices.

use std::sync::Arc;
use std::time::Duration;

use sorter_core::counts::{BLACK_COUNT_ADDR, WHITE_COUNT_ADDR};
use sorter_core::mocks::MemoryStore;
use sorter_core::{
    ButtonAction, ButtonClassifier, ButtonId, IndicatorColor, InputSampler, Pacer,
    PresenceDebouncer, RawInputs, SensorClassifier, Signals, SorterCfg, SorterEvent, SorterState,
    StopReason, TimingCfg, build_sorter,
};
use sorter_hardware::{SimHopper, SimMarble, SimulatedSensor, SimulatedServo};
use sorter_traits::AnalogSensor;
use sorter_traits::clock::test_clock::TestClock;

#[test]
fn presence_scenario_white_black_then_empty() {
    let signals = Signals::new();
    let mut sampler = InputSampler::from_parts(
        SensorClassifier::new(8, 20),
        PresenceDebouncer::new(4),
        ButtonClassifier::new(3, 6),
        ButtonClassifier::new(3, 6),
    );
    let trace = [5u16, 15, 90, 90, 90, 90, 90];
    let expected = [true, true, true, true, true, false, false];
    for (reading, more) in trace.into_iter().zip(expected) {
        sampler.tick(
            RawInputs {
                readings: [Some(reading), None],
                ..RawInputs::default()
            },
            &signals,
        );
        assert_eq!(signals.more_marbles(), more, "after reading {reading}");
        assert_eq!(signals.reading(0), Some(reading));
    }
    // One marble brings it straight back.
    sampler.tick(
        RawInputs {
            readings: [Some(5), None],
            ..RawInputs::default()
        },
        &signals,
    );
    assert!(signals.more_marbles());
}

fn loop_cfg() -> SorterCfg {
    let mut cfg = SorterCfg::default();
    cfg.timing = TimingCfg {
        fast_tick: Duration::from_millis(1),
        pacer_tick: Duration::from_millis(10),
        sort_every_ticks: 2,
        quanta_per_second: 100,
        watchdog_ticks: 20,
    };
    cfg
}

/// Run one fast tick (and a pacer tick every tenth), then one control step.
struct Harness {
    signals: Arc<Signals>,
    sampler: InputSampler,
    pacer: Pacer,
    sensor: SimulatedSensor,
    ticks: u64,
}

impl Harness {
    fn tick(&mut self, start_pressed: bool) {
        let raw = RawInputs {
            readings: [self.sensor.read_channel(0).ok(), None],
            start_stop_pressed: start_pressed,
            reset_pressed: false,
        };
        self.sampler.tick(raw, &self.signals);
        self.ticks += 1;
        if self.ticks % 10 == 0 {
            self.pacer.tick(&self.signals);
        }
    }
}

#[test]
fn hopper_is_sorted_until_the_watchdog_fires() {
    let cfg = loop_cfg();
    let hopper = SimHopper::mixed(12);
    let signals = Arc::new(Signals::new());
    let servo = SimulatedServo::with_hopper(hopper.clone(), 1_500);
    let mut sorter = build_sorter(
        servo,
        MemoryStore::new(),
        cfg.clone(),
        signals.clone(),
        Some(Box::new(TestClock::new())),
    )
    .unwrap();
    let mut h = Harness {
        signals: signals.clone(),
        sampler: InputSampler::new(&cfg),
        pacer: Pacer::new(&cfg.timing),
        sensor: SimulatedSensor::new(hopper.clone()),
        ticks: 0,
    };

    // A 150 ms press starts the run on release.
    for _ in 0..150 {
        h.tick(true);
        sorter.step().unwrap();
    }
    h.tick(false);
    assert_eq!(sorter.step().unwrap(), SorterState::Sort);

    let mut guard = 0;
    while sorter.state() == SorterState::Sort {
        h.tick(false);
        sorter.step().unwrap();
        guard += 1;
        assert!(guard < 50_000, "run never finished");
    }

    assert_eq!(hopper.remaining(), 0);
    assert_eq!(hopper.delivered().len(), 12);
    let counts = sorter.counts();
    assert_eq!((counts.black(), counts.white()), (4, 8));
    assert_eq!(sorter.indicator(), IndicatorColor::Red);
    assert_eq!(sorter.store().peek(BLACK_COUNT_ADDR), 4);
    assert_eq!(sorter.store().peek(WHITE_COUNT_ADDR), 8);

    let events: Vec<_> = sorter.events().try_iter().collect();
    assert_eq!(events.first(), Some(&SorterEvent::SortStarted));
    assert_eq!(
        events.last(),
        Some(&SorterEvent::SortStopped {
            reason: StopReason::WatchdogSuccess,
            total: 12
        })
    );
}

#[test]
fn short_run_fails_and_needs_a_press() {
    let mut cfg = loop_cfg();
    cfg.sort.success_threshold = 10;
    let hopper = SimHopper::new([SimMarble::Black, SimMarble::White]);
    let signals = Arc::new(Signals::new());
    let mut sorter = build_sorter(
        SimulatedServo::with_hopper(hopper.clone(), 1_500),
        MemoryStore::new(),
        cfg.clone(),
        signals.clone(),
        Some(Box::new(TestClock::new())),
    )
    .unwrap();
    let mut h = Harness {
        signals: signals.clone(),
        sampler: InputSampler::new(&cfg),
        pacer: Pacer::new(&cfg.timing),
        sensor: SimulatedSensor::new(hopper.clone()),
        ticks: 0,
    };

    for _ in 0..150 {
        h.tick(true);
    }
    h.tick(false);
    sorter.step().unwrap();

    let mut guard = 0;
    while !sorter.flash_error() {
        h.tick(false);
        sorter.step().unwrap();
        guard += 1;
        assert!(guard < 50_000, "watchdog never fired");
    }
    assert_eq!(sorter.counts().total(), 2);
    assert_eq!(sorter.state(), SorterState::Sort);

    // Keep ticking: still waiting.
    for _ in 0..500 {
        h.tick(false);
        sorter.step().unwrap();
    }
    assert!(sorter.flash_error());

    for _ in 0..150 {
        h.tick(true);
        sorter.step().unwrap();
    }
    h.tick(false);
    assert_eq!(sorter.step().unwrap(), SorterState::Idle);
    assert_eq!(signals.peek(ButtonId::StartStop), ButtonAction::None);
}

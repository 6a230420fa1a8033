//! `run` with real tick threads over simulated devices.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use sorter_core::mocks::MemoryStore;
use sorter_core::{Inputs, RunOptions, Signals, SorterCfg, SorterState, build_sorter, run};
use sorter_hardware::{SimHopper, SimulatedButton, SimulatedSensor, SimulatedServo};
use sorter_traits::clock::{Clock, MonotonicClock};

fn fast_cfg() -> SorterCfg {
    let mut cfg = SorterCfg::default();
    cfg.timing.sort_every_ticks = 2;
    cfg.timing.watchdog_ticks = 30;
    cfg.servo.dwell = Duration::from_millis(5);
    cfg.sort.success_threshold = 3;
    cfg
}

#[test]
fn preset_stop_returns_immediately() {
    let cfg = fast_cfg();
    let signals = Arc::new(Signals::new());
    let mut sorter = build_sorter(
        SimulatedServo::new(),
        MemoryStore::new(),
        cfg.clone(),
        signals,
        None,
    )
    .unwrap();
    let opts = RunOptions::default();
    opts.stop.store(true, Ordering::Relaxed);
    let inputs = Inputs {
        sensor: SimulatedSensor::new(SimHopper::default()),
        start_stop: SimulatedButton::new(),
        reset: SimulatedButton::new(),
    };
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let summary = run(&mut sorter, inputs, &cfg, clock, &opts);
    assert_eq!(summary.steps, 0);
    assert_eq!(summary.state, SorterState::Idle);
}

#[test]
fn operator_press_sorts_the_hopper() {
    let cfg = fast_cfg();
    let hopper = SimHopper::mixed(3);
    let signals = Arc::new(Signals::new());
    let mut sorter = build_sorter(
        SimulatedServo::with_hopper(hopper.clone(), 1_500),
        MemoryStore::new(),
        cfg.clone(),
        signals,
        None,
    )
    .unwrap();
    let start = SimulatedButton::new();
    let handle = start.handle();
    let inputs = Inputs {
        sensor: SimulatedSensor::new(hopper.clone()),
        start_stop: start,
        reset: SimulatedButton::new(),
    };
    let opts = RunOptions {
        limit: Some(Duration::from_millis(2_500)),
        ..RunOptions::default()
    };
    let presser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        handle.press_for(Duration::from_millis(200));
    });

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let summary = run(&mut sorter, inputs, &cfg, clock, &opts);
    presser.join().unwrap();

    assert_eq!(summary.step_errors, 0);
    assert_eq!(summary.counts.total(), 3);
    assert_eq!(hopper.remaining(), 0);
    assert_eq!(summary.state, SorterState::Idle, "watchdog ended the run");
}

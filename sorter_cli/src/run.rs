//! Command implementations: device assembly, the run loop, recall/reset.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use serde_json::json;
use sorter_core::{
    CountStore, Inputs, PersistedSnapshot, RunOptions, RunSummary, ServoMapper, Signals,
    SorterCfg, SorterError, SorterEvent, StopReason, build_sorter,
};
use sorter_hardware::{ButtonHandle, FileEeprom, MemoryEeprom, SimHopper, SimulatedButton};
use sorter_traits::clock::{Clock, MonotonicClock};
use sorter_traits::{AnalogSensor, ButtonInput, ByteStore, ServoDriver};

use crate::cli::{RtLock, RunArgs};
use crate::rt::setup_rt_once;

type BoxStore = Box<dyn ByteStore + Send>;

/// Open the statistics store named in `[storage]`, or a volatile one.
pub fn open_store(cfg: &sorter_config::Config) -> eyre::Result<BoxStore> {
    match cfg.storage.path.as_deref() {
        Some(path) => {
            let eeprom = FileEeprom::open(path)
                .map_err(|e| SorterError::Storage(e.to_string()))
                .wrap_err_with(|| format!("open statistics store {path}"))?;
            Ok(Box::new(eeprom))
        }
        None => {
            tracing::info!("no [storage] path; statistics are kept in memory only");
            Ok(Box::new(MemoryEeprom::default()))
        }
    }
}

fn status_line(snap: &PersistedSnapshot) -> String {
    format!(
        "elapsed {} | black {} | white {} | total {}",
        snap.elapsed,
        snap.black,
        snap.white,
        snap.total()
    )
}

fn snapshot_json(snap: &PersistedSnapshot) -> serde_json::Value {
    json!({
        "minutes": snap.elapsed.minutes,
        "seconds": snap.elapsed.seconds,
        "black": snap.black,
        "white": snap.white,
        "total": snap.total(),
    })
}

pub fn run_recall(cfg: &sorter_config::Config, json_mode: bool) -> eyre::Result<()> {
    let mut counts = CountStore::new(open_store(cfg)?);
    let snap = counts.load_snapshot().wrap_err("read statistics")?;
    if json_mode {
        println!("{}", json!({ "recall": snapshot_json(&snap) }));
    } else {
        println!("{}", status_line(&snap));
    }
    Ok(())
}

pub fn run_reset(cfg: &sorter_config::Config, json_mode: bool) -> eyre::Result<()> {
    let mut counts = CountStore::new(open_store(cfg)?);
    counts.reset().wrap_err("zero statistics")?;
    if json_mode {
        println!("{}", json!({ "reset": true }));
    } else {
        println!("statistics cleared");
    }
    Ok(())
}

pub fn run_self_check(cfg: &sorter_config::Config, json_mode: bool) -> eyre::Result<()> {
    let mut counts = CountStore::new(open_store(cfg)?);
    counts.load_snapshot().wrap_err("read statistics")?;
    let core_cfg = SorterCfg::from(cfg);
    let neutral = ServoMapper::from(&core_cfg.servo).neutral_pulse()?;

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let (mut sensor, mut start, mut reset, _servo) = hardware_devices(cfg, neutral)?;
        let reading = sensor.read_channel(0).map_err(|e| eyre::eyre!(e))?;
        let start_high = start.is_high().map_err(|e| eyre::eyre!(e))?;
        let reset_high = reset.is_high().map_err(|e| eyre::eyre!(e))?;
        tracing::info!(reading, start_high, reset_high, "devices answered");
    }

    if json_mode {
        println!("{}", json!({ "self_check": "ok", "neutral_pulse": neutral }));
    } else {
        println!("OK");
    }
    Ok(())
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn hardware_devices(
    cfg: &sorter_config::Config,
    neutral: u16,
) -> eyre::Result<(
    sorter_hardware::Mcp3008,
    sorter_hardware::GpioButton,
    sorter_hardware::GpioButton,
    sorter_hardware::PwmServo,
)> {
    let lanes = if cfg.sensor.lanes >= 2 {
        vec![cfg.pins.servo_pwm_0, cfg.pins.servo_pwm_1]
    } else {
        vec![cfg.pins.servo_pwm_0]
    };
    Ok((
        sorter_hardware::Mcp3008::new().wrap_err("open MCP3008")?,
        sorter_hardware::GpioButton::new(cfg.pins.start_stop_btn).wrap_err("open start/stop button")?,
        sorter_hardware::GpioButton::new(cfg.pins.reset_btn).wrap_err("open reset button")?,
        sorter_hardware::PwmServo::new(&lanes, neutral).wrap_err("open servo PWM")?,
    ))
}

/// Press durations that classify as Press and Hold under `cfg`.
fn key_durations(cfg: &sorter_config::Config) -> (Duration, Duration) {
    let press = (cfg.buttons.press_ms + cfg.buttons.hold_ms) / 2;
    let hold = cfg.buttons.hold_ms + 200;
    (Duration::from_millis(press), Duration::from_millis(hold))
}

/// Translate operator keys on stdin into simulated button presses.
fn spawn_keyboard(
    start: ButtonHandle,
    reset: ButtonHandle,
    durations: (Duration, Duration),
    stop: Arc<AtomicBool>,
) {
    let (press, hold) = durations;
    // Detached: a blocking stdin read cannot be interrupted.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for key in line.chars() {
                match key {
                    's' => start.press_for(press),
                    'S' => start.press_for(hold),
                    'r' => reset.press_for(press),
                    'R' => reset.press_for(hold),
                    'q' => {
                        stop.store(true, Ordering::Relaxed);
                        return;
                    }
                    c if c.is_whitespace() => {}
                    other => tracing::warn!(key = %other, "unknown key (s S r R q)"),
                }
                // Let the fast tick see the release before the next key.
                std::thread::sleep(Duration::from_millis(50));
            }
        }
        tracing::debug!("stdin closed; keyboard thread exiting");
    });
}

fn stop_reason_name(r: StopReason) -> &'static str {
    match r {
        StopReason::OperatorStop => "OperatorStop",
        StopReason::WatchdogSuccess => "WatchdogSuccess",
        StopReason::WatchdogFailure => "WatchdogFailure",
    }
}

fn render_event(ev: &SorterEvent, json_mode: bool) -> String {
    if json_mode {
        let v = match ev {
            SorterEvent::Sorted { position, marble } => {
                json!({ "event": "Sorted", "lane": position.index(), "marble": format!("{marble:?}") })
            }
            SorterEvent::SortStopped { reason, total } => {
                json!({ "event": "SortStopped", "reason": stop_reason_name(*reason), "total": total })
            }
            SorterEvent::RecallShown(snap) => {
                json!({ "event": "RecallShown", "snapshot": snapshot_json(snap) })
            }
            other => json!({ "event": format!("{other:?}") }),
        };
        return v.to_string();
    }
    match ev {
        SorterEvent::SortStarted => "sorting started".to_string(),
        SorterEvent::NoMoreMarbles => "hopper empty; load marbles first".to_string(),
        SorterEvent::Sorted { position, marble } => {
            format!("lane {}: {marble:?}", position.index())
        }
        SorterEvent::SortStopped { reason, total } => match reason {
            StopReason::OperatorStop => format!("stopped by operator after {total} marbles"),
            StopReason::WatchdogSuccess => format!("hopper empty: sorted {total} marbles"),
            StopReason::WatchdogFailure => {
                format!("ERROR: hopper ran dry after {total} marbles; press start/stop")
            }
        },
        SorterEvent::ErrorAcknowledged => "error acknowledged".to_string(),
        SorterEvent::RecallShown(snap) => format!("recall: {}", status_line(snap)),
        SorterEvent::RecallClosed => "recall closed".to_string(),
        SorterEvent::ResetDone => "statistics reset".to_string(),
        SorterEvent::TestEntered => "test mode".to_string(),
        SorterEvent::TestExited => "test mode off".to_string(),
    }
}

/// Print events until `done` is set and the queue is drained.
fn spawn_display(
    events: xch::Receiver<SorterEvent>,
    done: Arc<AtomicBool>,
    json_mode: bool,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            match events.recv_timeout(Duration::from_millis(50)) {
                Ok(ev) => println!("{}", render_event(&ev, json_mode)),
                Err(xch::RecvTimeoutError::Timeout) if done.load(Ordering::Acquire) => break,
                Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

/// Build the sorter over `servo`/`store`, run it against `inputs`, and
/// print every event while it runs.
fn drive<V, S, B1, B2>(
    servo: V,
    store: BoxStore,
    inputs: Inputs<S, B1, B2>,
    core_cfg: SorterCfg,
    opts: &RunOptions,
    json_mode: bool,
) -> eyre::Result<RunSummary>
where
    V: ServoDriver,
    S: AnalogSensor + Send + 'static,
    B1: ButtonInput + Send + 'static,
    B2: ButtonInput + Send + 'static,
{
    let signals = Arc::new(Signals::new());
    let mut sorter = build_sorter(
        servo,
        store,
        core_cfg.clone(),
        signals,
        Some(Box::new(MonotonicClock::new())),
    )
    .wrap_err("build sorter")?;

    let done = Arc::new(AtomicBool::new(false));
    let display = spawn_display(sorter.events(), done.clone(), json_mode);
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let summary = sorter_core::run(&mut sorter, inputs, &core_cfg, clock, opts);
    done.store(true, Ordering::Release);
    if display.join().is_err() {
        tracing::warn!("display thread panicked");
    }
    Ok(summary)
}

pub fn run_sorter(
    cfg: &sorter_config::Config,
    args: &RunArgs,
    shutdown: Arc<AtomicBool>,
    json_mode: bool,
) -> eyre::Result<RunSummary> {
    setup_rt_once(
        args.rt,
        args.rt_prio,
        args.rt_lock.unwrap_or(RtLock::os_default()),
    );

    let core_cfg = SorterCfg::from(cfg);
    let neutral = ServoMapper::from(&core_cfg.servo).neutral_pulse()?;
    let store = open_store(cfg)?;
    let opts = RunOptions {
        stop: shutdown.clone(),
        limit: args.duration_ms.map(Duration::from_millis),
    };
    let durations = key_durations(cfg);

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let _ = durations;
        let (sensor, start, reset, servo) = hardware_devices(cfg, neutral)?;
        tracing::info!("running on Raspberry Pi devices");
        drive(
            servo,
            store,
            Inputs {
                sensor,
                start_stop: start,
                reset,
            },
            core_cfg,
            &opts,
            json_mode,
        )
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let hopper = SimHopper::mixed(args.marbles);
        let start = SimulatedButton::new();
        let reset = SimulatedButton::new();
        spawn_keyboard(start.handle(), reset.handle(), durations, shutdown);
        if args.autostart {
            let handle = start.handle();
            let press = durations.0;
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                handle.press_for(press);
            });
        }
        tracing::info!(marbles = args.marbles, "running on simulated devices");
        drive(
            sorter_hardware::SimulatedServo::with_hopper(hopper.clone(), neutral),
            store,
            Inputs {
                sensor: sorter_hardware::SimulatedSensor::new(hopper),
                start_stop: start,
                reset,
            },
            core_cfg,
            &opts,
            json_mode,
        )
    }
}

pub fn print_summary(summary: &RunSummary, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({
                "summary": {
                    "state": summary.state.name(),
                    "black": summary.counts.black(),
                    "white": summary.counts.white(),
                    "total": summary.counts.total(),
                    "elapsed": summary.elapsed.to_string(),
                    "steps": summary.steps,
                    "step_errors": summary.step_errors,
                }
            })
        );
    } else {
        println!(
            "summary: state {} | black {} | white {} | total {} | elapsed {}",
            summary.state.name(),
            summary.counts.black(),
            summary.counts.white(),
            summary.counts.total(),
            summary.elapsed
        );
    }
}

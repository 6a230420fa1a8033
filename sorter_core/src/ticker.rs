//! Background tick threads.
//!
//! `Ticker` spawns the fast input thread (owns the sensor and both buttons)
//! and the pacer thread. Both publish into the shared `Signals` and are
//! shut down and joined when the `Ticker` is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use sorter_traits::{AnalogSensor, ButtonInput, Clock};

use crate::config::SorterCfg;
use crate::signals::Signals;
use crate::tick::{InputSampler, Pacer, RawInputs};

/// Devices sampled by the fast tick.
pub struct Inputs<S, B1, B2> {
    pub sensor: S,
    pub start_stop: B1,
    pub reset: B2,
}

pub struct Ticker {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<S, B1, B2>(
        inputs: Inputs<S, B1, B2>,
        cfg: &SorterCfg,
        signals: Arc<Signals>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self
    where
        S: AnalogSensor + Send + 'static,
        B1: ButtonInput + Send + 'static,
        B2: ButtonInput + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let lanes = cfg.sensor.lanes.clamp(1, 2);

        let fast = {
            let shutdown = shutdown.clone();
            let signals = signals.clone();
            let clock = clock.clone();
            let period = cfg.timing.fast_tick;
            let mut sampler = InputSampler::new(cfg);
            let Inputs {
                mut sensor,
                mut start_stop,
                mut reset,
            } = inputs;
            std::thread::spawn(move || {
                run_periodic(&*clock, period, &shutdown, || {
                    let raw = RawInputs {
                        readings: [
                            read_lane(&mut sensor, 0),
                            if lanes == 2 { read_lane(&mut sensor, 1) } else { None },
                        ],
                        start_stop_pressed: read_button(&mut start_stop),
                        reset_pressed: read_button(&mut reset),
                    };
                    sampler.tick(raw, &signals);
                });
                tracing::trace!("fast tick thread exiting cleanly");
            })
        };

        let pacer = {
            let shutdown = shutdown.clone();
            let period = cfg.timing.pacer_tick;
            let mut pacer = Pacer::new(&cfg.timing);
            std::thread::spawn(move || {
                run_periodic(&*clock, period, &shutdown, || pacer.tick(&signals));
                tracing::trace!("pacer thread exiting cleanly");
            })
        };

        Self {
            shutdown,
            handles: vec![fast, pacer],
        }
    }

    /// Stop both threads and wait for them.
    pub fn stop(mut self) {
        self.join_all();
    }

    /// Whether both tick threads are still alive.
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty() && self.handles.iter().all(|h| !h.is_finished())
    }

    fn join_all(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                // We may be in Drop; log and carry on.
                tracing::warn!(?e, "tick thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.join_all();
    }
}

/// Call `f` every `period` against absolute deadlines until `shutdown` is set.
fn run_periodic(clock: &dyn Clock, period: Duration, shutdown: &AtomicBool, mut f: impl FnMut()) {
    let period = period.max(Duration::from_micros(1));
    let mut next: Instant = clock.now();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        f();
        next += period;
        let now = clock.now();
        if now > next + period {
            // Fell more than a period behind; resync instead of bursting.
            next = now;
        }
        clock.sleep_until(next);
    }
}

fn read_lane<S: AnalogSensor>(sensor: &mut S, lane: u8) -> Option<u16> {
    match sensor.read_channel(lane) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::trace!(lane, error = %e, "sensor read failed");
            None
        }
    }
}

fn read_button<B: ButtonInput>(button: &mut B) -> bool {
    button.is_pressed().unwrap_or_else(|e| {
        tracing::trace!(error = %e, "button read failed");
        false
    })
}

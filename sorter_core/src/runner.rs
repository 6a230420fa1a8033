//! Run the control loop with live tick threads until told to stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sorter_traits::clock::Clock;
use sorter_traits::{AnalogSensor, ButtonInput, ByteStore, ServoDriver};

use crate::config::SorterCfg;
use crate::core::Sorter;
use crate::ticker::{Inputs, Ticker};
use crate::types::{ElapsedTime, MarbleCounts, SorterState};

/// Shortest control-loop poll interval.
const MIN_POLL: Duration = Duration::from_micros(100);
/// Longest control-loop poll interval; keeps button latency imperceptible.
const MAX_POLL: Duration = Duration::from_millis(5);

/// How long the control loop runs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Set from elsewhere (Ctrl-C, another thread) to end the run.
    pub stop: Arc<AtomicBool>,
    /// End the run after this much wall time.
    pub limit: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            limit: None,
        }
    }
}

/// What the machine looked like when the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub state: SorterState,
    pub counts: MarbleCounts,
    pub elapsed: ElapsedTime,
    pub steps: u64,
    pub step_errors: u64,
}

/// Control-loop poll interval derived from the fast tick period.
#[inline]
pub(crate) fn poll_interval(fast_tick: Duration) -> Duration {
    fast_tick.clamp(MIN_POLL, MAX_POLL)
}

#[inline]
fn limit_reached(elapsed_ms: u64, limit: Option<Duration>) -> bool {
    limit.is_some_and(|l| u128::from(elapsed_ms) >= l.as_millis())
}

/// Spawn the tick threads over `inputs`, then step `sorter` until `opts`
/// says stop. Step failures are logged and the loop carries on.
pub fn run<V, B, S, B1, B2>(
    sorter: &mut Sorter<V, B>,
    inputs: Inputs<S, B1, B2>,
    cfg: &SorterCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    opts: &RunOptions,
) -> RunSummary
where
    V: ServoDriver,
    B: ByteStore,
    S: AnalogSensor + Send + 'static,
    B1: ButtonInput + Send + 'static,
    B2: ButtonInput + Send + 'static,
{
    let ticker = Ticker::spawn(inputs, cfg, sorter.signals().clone(), clock.clone());
    let poll = poll_interval(cfg.timing.fast_tick);
    let epoch = clock.now();
    let mut steps = 0u64;
    let mut step_errors = 0u64;

    tracing::info!(?poll, limit = ?opts.limit, "control loop started");
    while !opts.stop.load(Ordering::Relaxed) && !limit_reached(clock.ms_since(epoch), opts.limit) {
        if let Err(e) = sorter.step() {
            step_errors += 1;
            tracing::warn!(error = ?e, state = sorter.state().name(), "control step failed");
        }
        steps += 1;
        clock.sleep(poll);
    }
    ticker.stop();

    if let Err(e) = sorter.park() {
        tracing::warn!(error = ?e, "failed to park servos at shutdown");
    }

    let summary = RunSummary {
        state: sorter.state(),
        counts: sorter.counts(),
        elapsed: sorter.elapsed(),
        steps,
        step_errors,
    };
    tracing::info!(?summary, "control loop stopped");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_clamped() {
        assert_eq!(poll_interval(Duration::from_millis(1)), Duration::from_millis(1));
        assert_eq!(poll_interval(Duration::from_micros(10)), MIN_POLL);
        assert_eq!(poll_interval(Duration::from_millis(50)), MAX_POLL);
    }

    #[test]
    fn limit_is_inclusive_and_optional() {
        assert!(!limit_reached(10_000, None));
        assert!(!limit_reached(99, Some(Duration::from_millis(100))));
        assert!(limit_reached(100, Some(Duration::from_millis(100))));
    }
}

//! Simulated devices for running the sorter without a Raspberry Pi.
//!
//! `SimHopper` is a queue of marbles in front of the sensor. The simulated
//! sensor reads the marble at each lane; a deflected flap on the simulated
//! servo takes the marble at that lane, and the hopper closes the gap once a
//! flap returns to neutral.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use sorter_traits::{AnalogSensor, ButtonInput, HwResult, ServoDriver};

use crate::error::HwError;

/// Reading produced by a white marble (reflective, low value).
pub const WHITE_LEVEL: u16 = 5;
/// Reading produced by a black marble.
pub const BLACK_LEVEL: u16 = 15;
/// Reading with nothing in front of the sensor.
pub const EMPTY_LEVEL: u16 = 90;

/// Neutral pulse for the stock servo mapping.
pub const NEUTRAL_PULSE: u16 = 1_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMarble {
    White,
    Black,
}

impl SimMarble {
    pub fn level(self) -> u16 {
        match self {
            SimMarble::White => WHITE_LEVEL,
            SimMarble::Black => BLACK_LEVEL,
        }
    }
}

#[derive(Debug, Default)]
struct HopperState {
    queue: VecDeque<SimMarble>,
    taken: [bool; 2],
    delivered: Vec<(u8, SimMarble)>,
}

/// Shared marble queue; clones see the same hopper.
#[derive(Debug, Clone, Default)]
pub struct SimHopper {
    inner: Arc<Mutex<HopperState>>,
}

impl SimHopper {
    pub fn new(marbles: impl IntoIterator<Item = SimMarble>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HopperState {
                queue: marbles.into_iter().collect(),
                ..HopperState::default()
            })),
        }
    }

    /// `count` marbles in a fixed, mixed colour order.
    pub fn mixed(count: usize) -> Self {
        Self::new((0..count).map(|i| {
            if i % 3 == 1 {
                SimMarble::Black
            } else {
                SimMarble::White
            }
        }))
    }

    fn lock(&self) -> HwResult<MutexGuard<'_, HopperState>> {
        self.inner
            .lock()
            .map_err(|_| HwError::Gpio("hopper state poisoned".into()).into())
    }

    pub fn remaining(&self) -> usize {
        self.inner.lock().map(|s| s.queue.len()).unwrap_or(0)
    }

    /// Marbles taken off the track so far, with the flap that took them.
    pub fn delivered(&self) -> Vec<(u8, SimMarble)> {
        self.inner
            .lock()
            .map(|s| s.delivered.clone())
            .unwrap_or_default()
    }

    pub fn push(&self, marble: SimMarble) {
        if let Ok(mut s) = self.inner.lock() {
            s.queue.push_back(marble);
        }
    }

    fn reading(&self, lane: u8) -> HwResult<u16> {
        let s = self.lock()?;
        Ok(s.queue
            .get(usize::from(lane))
            .map_or(EMPTY_LEVEL, |m| m.level()))
    }

    fn take(&self, lane: u8) -> HwResult<()> {
        let mut s = self.lock()?;
        let idx = usize::from(lane);
        if idx < s.taken.len() && idx < s.queue.len() {
            s.taken[idx] = true;
        }
        Ok(())
    }

    /// Remove every taken marble, highest lane first so indices stay valid.
    fn settle(&self) -> HwResult<()> {
        let mut s = self.lock()?;
        for idx in (0..s.taken.len()).rev() {
            if std::mem::take(&mut s.taken[idx])
                && let Some(m) = s.queue.remove(idx)
            {
                s.delivered.push((idx as u8, m));
            }
        }
        Ok(())
    }
}

/// Reflectance sensor looking at a `SimHopper`.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    hopper: SimHopper,
}

impl SimulatedSensor {
    pub fn new(hopper: SimHopper) -> Self {
        Self { hopper }
    }
}

impl AnalogSensor for SimulatedSensor {
    fn read_channel(&mut self, channel: u8) -> HwResult<u16> {
        if channel > 1 {
            return Err(HwError::InvalidChannel(channel).into());
        }
        self.hopper.reading(channel)
    }
}

/// Push button whose level is driven through a `ButtonHandle`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedButton {
    pressed: Arc<AtomicBool>,
}

/// Remote control for a `SimulatedButton`.
#[derive(Debug, Clone)]
pub struct ButtonHandle {
    pressed: Arc<AtomicBool>,
}

impl SimulatedButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ButtonHandle {
        ButtonHandle {
            pressed: self.pressed.clone(),
        }
    }
}

impl ButtonHandle {
    pub fn set_pressed(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::Release);
    }

    /// Hold the button down for `d`, then release. Blocks the caller.
    pub fn press_for(&self, d: Duration) {
        self.set_pressed(true);
        std::thread::sleep(d);
        self.set_pressed(false);
    }
}

impl ButtonInput for SimulatedButton {
    fn is_high(&mut self) -> HwResult<bool> {
        // Active-low: pressed pulls the line low.
        Ok(!self.pressed.load(Ordering::Acquire))
    }
}

/// Servo bank that records every pulse and, when attached to a hopper,
/// takes marbles off the track as flaps deflect.
#[derive(Debug, Clone)]
pub struct SimulatedServo {
    log: Arc<Mutex<Vec<(u8, u16)>>>,
    hopper: Option<SimHopper>,
    neutral: u16,
}

impl Default for SimulatedServo {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedServo {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            hopper: None,
            neutral: NEUTRAL_PULSE,
        }
    }

    pub fn with_hopper(hopper: SimHopper, neutral: u16) -> Self {
        Self {
            hopper: Some(hopper),
            neutral,
            ..Self::new()
        }
    }

    pub fn pulses(&self) -> Vec<(u8, u16)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ServoDriver for SimulatedServo {
    fn set_pulse(&mut self, index: u8, pulse: u16) -> HwResult<()> {
        if index > 1 {
            return Err(HwError::InvalidChannel(index).into());
        }
        self.log
            .lock()
            .map_err(|_| HwError::Pwm("servo log poisoned".into()))?
            .push((index, pulse));
        tracing::trace!(index, pulse, "servo pulse (simulated)");
        if let Some(h) = &self.hopper {
            if pulse == self.neutral {
                h.settle()?;
            } else {
                h.take(index)?;
            }
        }
        Ok(())
    }
}

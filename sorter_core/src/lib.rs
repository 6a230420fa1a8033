#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Real-time control core of the marble sorter (hardware-agnostic).
//!
//! All hardware goes through the `sorter_traits` seams: `AnalogSensor`,
//! `ButtonInput`, `ServoDriver` and `ByteStore`.
//!
//! ## Architecture
//!
//! - **Classification**: reading -> colour (`classifier`), sustained absence
//!   (`presence`), press/hold (`button`)
//! - **Shared cells**: single-atomic flags between tick threads and the
//!   control loop (`signals`)
//! - **Ticks**: per-tick logic (`tick`) and the threads running it (`ticker`)
//! - **Outputs**: flap angles and pulses (`servo`), tallies and their durable
//!   mirror (`counts`), sorting time (`elapsed`)
//! - **Control**: the operator state machine (`core::Sorter`), its builder,
//!   and a loop driver (`runner`)
//!
//! ## Timing
//!
//! The fast tick (nominal 1 ms) samples buttons and hopper presence. The
//! pacer (nominal 10 ms) gates sort cycles, counts elapsed-time quanta while
//! sorting, and raises the absence watchdog.

pub mod builder;
pub mod button;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod core;
pub mod counts;
pub mod elapsed;
pub mod error;
pub mod events;
pub mod hw_error;
pub mod mocks;
pub mod presence;
pub mod runner;
pub mod servo;
pub mod signals;
pub mod tick;
pub mod ticker;
pub mod types;
pub mod util;

pub use builder::{DynSorter, Missing, Set, SorterBuilder, build_sorter};
pub use button::ButtonClassifier;
pub use classifier::SensorClassifier;
pub use config::{
    ButtonCfg, PresenceCfg, SensorCfg, ServoCfg, SortCfg, SorterCfg, TimingCfg,
};
pub use crate::core::Sorter;
pub use counts::CountStore;
pub use elapsed::ElapsedTimeAccumulator;
pub use error::{BuildError, Result, SorterError};
pub use events::{SorterEvent, StopReason};
pub use presence::PresenceDebouncer;
pub use runner::{RunOptions, RunSummary, run};
pub use servo::ServoMapper;
pub use signals::{PendingAction, Signals};
pub use tick::{InputSampler, Pacer, RawInputs};
pub use ticker::{Inputs, Ticker};
pub use types::{
    ButtonAction, ButtonId, ElapsedTime, IndicatorColor, MarbleCounts, MarblePosition,
    MarbleType, PersistedSnapshot, SorterState,
};

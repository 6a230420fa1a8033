use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SorterError {
    #[error("invalid servo angle: {0} (must be within 0..=180 degrees)")]
    InvalidAngle(f32),
    #[error("servo pulse for {degrees} degrees is {counts} counts, outside 0..=65535")]
    PulseOutOfRange { degrees: f32, counts: i64 },
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing servo driver")]
    MissingServo,
    #[error("missing byte store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

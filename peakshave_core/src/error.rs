use thiserror::Error;

/// Why the schedule document could not be used this cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule file missing for {day}: {path}")]
    NotFound { day: String, path: String },
    #[error("failed reading schedule {path}: {reason}")]
    Malformed { path: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot index {index} out of range (schedule has {len} slots)")]
    OutOfRange { index: usize, len: usize },
    #[error("slot {index} rejected: {reason}")]
    Rejected { index: usize, reason: String },
}

#[derive(Debug, Error, Clone)]
pub enum ControlError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing schedule store")]
    MissingSchedule,
    #[error("missing state store")]
    MissingStateStore,
    #[error("missing remote signer")]
    MissingSigner,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
